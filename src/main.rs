use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use webbench::cli::Cli;
use webbench::config::Config;
use webbench::engine::{BenchError, Engine, WorkerConfig};
use webbench::report;
use webbench::request::{Proxy, RequestBuilder};

const EXIT_UNREACHABLE: u8 = 1;
const EXIT_BAD_PARAM: u8 = 2;
const EXIT_INTERNAL: u8 = 3;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("webbench=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    eprintln!("{}", report::copyright());

    let config = match &cli.config {
        Some(path) => match Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))
        {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{:#}", e);
                return ExitCode::from(EXIT_BAD_PARAM);
            }
        },
        None => Config::default(),
    };
    let mut run = config.run;
    cli.apply(&mut run);

    let proxy = match run.proxy.as_deref().map(Proxy::parse).transpose() {
        Ok(proxy) => proxy.flatten(),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_BAD_PARAM);
        }
    };
    let request = match RequestBuilder::new()
        .method(run.method)
        .version(run.protocol)
        .reload(run.reload)
        .proxy(proxy.clone())
        .build(&cli.url)
    {
        Ok(request) => request,
        Err(e) => {
            eprintln!("\n{}", e);
            return ExitCode::from(EXIT_BAD_PARAM);
        }
    };

    println!("{}", report::banner(&cli.url, &request, &run, proxy.as_ref()));

    let mut worker_config = WorkerConfig::from_request(request)
        .with_duration(Duration::from_secs(run.time_seconds))
        .with_io_timeout(Duration::from_millis(run.io_timeout_ms));
    if run.force {
        worker_config = worker_config.without_response();
    }

    match bench(worker_config, run.clients) {
        Ok(totals) => {
            println!("{}", report::summary(&totals));
            ExitCode::SUCCESS
        }
        Err(BenchError::Unreachable(e)) => {
            error!("{}", e);
            eprintln!("\nConnect to server failed. Aborting benchmark.");
            ExitCode::from(EXIT_UNREACHABLE)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(EXIT_INTERNAL)
        }
    }
}

fn bench(config: WorkerConfig, clients: usize) -> Result<webbench::engine::RunTotals, BenchError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(BenchError::Runtime)?;

    info!("Benchmarking {}:{}", config.host, config.port);
    let engine = Engine::new(config);
    runtime.block_on(engine.run(clients))
}
