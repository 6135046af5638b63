//! Human-readable output around a run.

use crate::config::RunConfig;
use crate::engine::RunTotals;
use crate::request::{HttpVersion, PROGRAM_VERSION, Proxy, Request};
use std::fmt::Write;

pub fn copyright() -> String {
    format!(
        "WebBench - Simple Web Benchmark {}\nCopyright (c) Radim Kolar 1997-2004, GPL Open Source Software.",
        PROGRAM_VERSION
    )
}

fn plural(n: u64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Describes the run that is about to start.
pub fn banner(url: &str, request: &Request, run: &RunConfig, proxy: Option<&Proxy>) -> String {
    let mut out = format!("\nBenchmarking: {} {}", request.method, url);
    match request.version {
        HttpVersion::Http09 => out.push_str(" (using HTTP/0.9)"),
        HttpVersion::Http11 => out.push_str(" (using HTTP/1.1)"),
        HttpVersion::Http10 => {}
    }

    let clients = run.clients as u64;
    let _ = write!(
        out,
        "\n{} client{}, running {} second{}",
        clients,
        plural(clients),
        run.time_seconds,
        plural(run.time_seconds)
    );
    if run.force {
        out.push_str(", early socket close");
    }
    if let Some(proxy) = proxy {
        let _ = write!(out, ", via proxy server {}", proxy);
    }
    if run.reload {
        out.push_str(", forcing reload");
    }
    out.push('.');
    out
}

pub fn summary(totals: &RunTotals) -> String {
    let mut out = format!(
        "\nSpeed = {} (pages/min), {} (bytes/sec).\nRequests: {} succeeded, {} failed.",
        totals.pages_per_minute() as u64,
        totals.bytes_per_second() as u64,
        totals.succeeded,
        totals.failed
    );
    if totals.missing_workers() > 0 {
        let _ = write!(
            out,
            "\nWarning: some workers produced no result ({} of {} reported).",
            totals.workers_reporting, totals.workers_spawned
        );
    }
    out
}
