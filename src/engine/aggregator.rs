use super::worker::WorkerResult;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct WorkerReport {
    pub worker: usize,
    pub result: WorkerResult,
}

/// Sending half handed to a single worker. Consumed by the one report it
/// makes; dropping it unsent marks the worker as dead.
#[derive(Debug)]
pub struct ReportHandle {
    worker: usize,
    tx: oneshot::Sender<WorkerReport>,
}

impl ReportHandle {
    pub fn send(self, result: WorkerResult) {
        let report = WorkerReport {
            worker: self.worker,
            result,
        };
        if self.tx.send(report).is_err() {
            warn!("Aggregator gone, report from worker {} dropped", self.worker);
        }
    }
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTotals {
    pub succeeded: u64,
    pub failed: u64,
    pub bytes: u64,
    pub workers_spawned: usize,
    pub workers_reporting: usize,
    /// Configured run length, used for rates.
    pub duration: Duration,
}

impl RunTotals {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            ..Default::default()
        }
    }

    pub fn add(&mut self, result: &WorkerResult) {
        self.succeeded += result.succeeded;
        self.failed += result.failed;
        self.bytes += result.bytes;
        self.workers_reporting += 1;
    }

    pub fn total_requests(&self) -> u64 {
        self.succeeded + self.failed
    }

    pub fn missing_workers(&self) -> usize {
        self.workers_spawned.saturating_sub(self.workers_reporting)
    }

    pub fn pages_per_minute(&self) -> f64 {
        let minutes = self.duration.as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.total_requests() as f64 / minutes
        } else {
            0.0
        }
    }

    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / secs
        } else {
            0.0
        }
    }
}

/// Fan-in of one-shot worker reports.
pub struct Aggregator {
    pending: FuturesUnordered<oneshot::Receiver<WorkerReport>>,
    registered: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            pending: FuturesUnordered::new(),
            registered: 0,
        }
    }

    pub fn register(&mut self) -> ReportHandle {
        let (tx, rx) = oneshot::channel();
        self.pending.push(rx);
        let worker = self.registered;
        self.registered += 1;
        ReportHandle { worker, tx }
    }

    /// Waits for every registered worker to report or die, in whatever order
    /// that happens.
    pub async fn collect(mut self, duration: Duration) -> RunTotals {
        let mut totals = RunTotals::new(duration);
        totals.workers_spawned = self.registered;

        while let Some(report) = self.pending.next().await {
            match report {
                Ok(report) => {
                    debug!("Received report from worker {}", report.worker);
                    totals.add(&report.result);
                }
                Err(_) => debug!("A worker exited without reporting"),
            }
        }

        if totals.missing_workers() > 0 {
            warn!(
                "Some of our workers died: {} of {} produced no result",
                totals.missing_workers(),
                totals.workers_spawned
            );
        }
        totals
    }
}
