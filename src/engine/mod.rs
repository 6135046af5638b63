//! The concurrent benchmark engine: a pre-flight probe, then N isolated
//! workers hammering one endpoint until their deadline, then a fan-in of
//! their counters.

mod aggregator;
mod connector;
mod deadline;
mod worker;

pub use aggregator::{Aggregator, ReportHandle, RunTotals, WorkerReport};
pub use connector::ConnectError;
pub use deadline::Deadline;
pub use worker::{Worker, WorkerResult};

use crate::request::{HttpVersion, Request};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_DURATION: Duration = Duration::from_secs(30);
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("target unreachable: {0}")]
    Unreachable(#[source] ConnectError),
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// What every worker sends and how. Never mutated once built.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub host: String,
    pub port: u16,
    pub request: Vec<u8>,
    pub protocol: HttpVersion,
    pub wait_for_response: bool,
    pub duration: Duration,
    /// Upper bound on a single connect or write.
    pub io_timeout: Duration,
}

impl WorkerConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        request: impl Into<Vec<u8>>,
        protocol: HttpVersion,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            request: request.into(),
            protocol,
            wait_for_response: true,
            duration: DEFAULT_DURATION,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn from_request(request: Request) -> Self {
        Self::new(request.host, request.port, request.payload, request.version)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Close each connection right after sending, without reading.
    pub fn without_response(mut self) -> Self {
        self.wait_for_response = false;
        self
    }
}

pub struct Engine {
    config: Arc<WorkerConfig>,
}

impl Engine {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Single trial connection, closed straight away.
    pub async fn probe(&self) -> Result<(), BenchError> {
        let cfg = &self.config;
        let stream = connector::connect(&cfg.host, cfg.port, cfg.io_timeout)
            .await
            .map_err(BenchError::Unreachable)?;
        drop(stream);
        debug!("Probe to {}:{} succeeded", cfg.host, cfg.port);
        Ok(())
    }

    /// Probes the target, then runs `workers` workers to completion. Nothing
    /// is spawned when the probe fails.
    pub async fn run(&self, workers: usize) -> Result<RunTotals, BenchError> {
        self.probe().await?;
        Ok(self.run_workers(workers).await)
    }

    /// Spawns the workers and sums their reports.
    pub async fn run_workers(&self, workers: usize) -> RunTotals {
        let workers = workers.max(1);
        info!(
            "Starting {} workers against {}:{} for {:?}",
            workers, self.config.host, self.config.port, self.config.duration
        );

        let mut aggregator = Aggregator::new();
        for id in 0..workers {
            let worker = Worker::new(id, self.config.clone(), aggregator.register());
            tokio::spawn(worker.run());
        }

        let totals = aggregator.collect(self.config.duration).await;
        info!(
            "Run finished: {} succeeded, {} failed, {} bytes from {}/{} workers",
            totals.succeeded,
            totals.failed,
            totals.bytes,
            totals.workers_reporting,
            totals.workers_spawned
        );
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_test::assert_err;

    #[tokio::test]
    async fn closed_port_aborts_before_spawning() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let engine = Engine::new(
            WorkerConfig::new("127.0.0.1", port, b"GET /\r\n".to_vec(), HttpVersion::Http09)
                .with_duration(Duration::from_millis(200)),
        );
        let err = assert_err!(engine.run(4).await);
        assert!(matches!(err, BenchError::Unreachable(_)));
    }

    #[test]
    fn config_from_request() {
        let request = Request {
            host: "example.com".into(),
            port: 8080,
            method: crate::request::Method::Get,
            version: HttpVersion::Http11,
            payload: b"GET / HTTP/1.1\r\n\r\n".to_vec(),
        };
        let cfg = WorkerConfig::from_request(request).without_response();
        assert_eq!(cfg.host, "example.com");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.protocol, HttpVersion::Http11);
        assert!(!cfg.wait_for_response);
        assert_eq!(cfg.duration, DEFAULT_DURATION);
        assert_eq!(cfg.io_timeout, DEFAULT_IO_TIMEOUT);
    }
}
