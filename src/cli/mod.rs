use crate::config::RunConfig;
use crate::request::{HttpVersion, Method, PROGRAM_VERSION};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "webbench", version = PROGRAM_VERSION)]
#[command(about = "Simple website stress testing tool", long_about = None)]
pub struct Cli {
    /// URL to benchmark, e.g. http://example.com/
    pub url: String,

    /// Don't wait for reply from server
    #[arg(short, long)]
    pub force: bool,

    /// Send reload request - Pragma: no-cache
    #[arg(short, long)]
    pub reload: bool,

    /// Run benchmark for <SEC> seconds [default: 30]
    #[arg(short, long, value_name = "SEC")]
    pub time: Option<u64>,

    /// Use proxy server for request
    #[arg(short, long, value_name = "SERVER:PORT")]
    pub proxy: Option<String>,

    /// Run <N> HTTP clients at once [default: 1]
    #[arg(short, long, value_name = "N")]
    pub clients: Option<usize>,

    /// Use HTTP/0.9 style requests
    #[arg(short = '9', long, overrides_with_all = ["http10", "http11"])]
    pub http09: bool,

    /// Use HTTP/1.0 protocol
    #[arg(short = '1', long, overrides_with_all = ["http09", "http11"])]
    pub http10: bool,

    /// Use HTTP/1.1 protocol
    #[arg(short = '2', long, overrides_with_all = ["http09", "http10"])]
    pub http11: bool,

    /// Use GET request method
    #[arg(long, overrides_with_all = ["head", "options", "trace"])]
    pub get: bool,

    /// Use HEAD request method
    #[arg(long, overrides_with_all = ["get", "options", "trace"])]
    pub head: bool,

    /// Use OPTIONS request method
    #[arg(long, overrides_with_all = ["get", "head", "trace"])]
    pub options: bool,

    /// Use TRACE request method
    #[arg(long, overrides_with_all = ["get", "head", "options"])]
    pub trace: bool,

    /// Read run settings from a TOML file; flags take precedence
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn protocol(&self) -> Option<HttpVersion> {
        if self.http09 {
            Some(HttpVersion::Http09)
        } else if self.http10 {
            Some(HttpVersion::Http10)
        } else if self.http11 {
            Some(HttpVersion::Http11)
        } else {
            None
        }
    }

    pub fn method(&self) -> Option<Method> {
        if self.get {
            Some(Method::Get)
        } else if self.head {
            Some(Method::Head)
        } else if self.options {
            Some(Method::Options)
        } else if self.trace {
            Some(Method::Trace)
        } else {
            None
        }
    }

    /// Layers the command line over settings loaded from file or defaults.
    pub fn apply(&self, run: &mut RunConfig) {
        if let Some(clients) = self.clients {
            run.clients = clients;
        }
        if let Some(time) = self.time {
            run.time_seconds = time;
        }
        run.force |= self.force;
        run.reload |= self.reload;
        if let Some(protocol) = self.protocol() {
            run.protocol = protocol;
        }
        if let Some(method) = self.method() {
            run.method = method;
        }
        if self.proxy.is_some() {
            run.proxy = self.proxy.clone();
        }
        run.sanitize();
    }
}
