use super::WorkerConfig;
use super::aggregator::ReportHandle;
use super::connector;
use super::deadline::Deadline;
use crate::request::HttpVersion;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, trace};

const READ_BUF_LEN: usize = 1500;

/// Counters a worker accumulates over its lifetime and reports once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerResult {
    pub succeeded: u64,
    pub failed: u64,
    pub bytes: u64,
}

impl WorkerResult {
    /// Drops the failure recorded for the attempt that was cut short by the
    /// deadline. Applied exactly once, on termination.
    fn settle(mut self) -> Self {
        self.failed = self.failed.saturating_sub(1);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connecting,
    Sending,
    HalfClosing,
    Receiving,
    Closing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connecting => "connect",
            Phase::Sending => "send",
            Phase::HalfClosing => "half-close",
            Phase::Receiving => "receive",
            Phase::Closing => "close",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
enum Outcome {
    Succeeded,
    Failed,
    /// The deadline passed mid-request; counts as neither success nor failure.
    Interrupted,
}

fn fail(phase: Phase, err: impl fmt::Display) -> Outcome {
    trace!("{} failed: {}", phase, err);
    Outcome::Failed
}

pub struct Worker {
    id: usize,
    config: Arc<WorkerConfig>,
    report: ReportHandle,
}

impl Worker {
    pub fn new(id: usize, config: Arc<WorkerConfig>, report: ReportHandle) -> Self {
        Self { id, config, report }
    }

    pub async fn run(self) {
        debug!("Worker {} started", self.id);
        let deadline = Deadline::start(self.config.duration);
        let result = run_until(&self.config, deadline).await;
        debug!(
            "Worker {} finished: {} succeeded, {} failed, {} bytes",
            self.id, result.succeeded, result.failed, result.bytes
        );
        self.report.send(result);
    }
}

/// Issues requests back to back until `deadline` passes. Failed attempts are
/// retried immediately with a fresh connection.
pub(crate) async fn run_until(config: &WorkerConfig, deadline: Deadline) -> WorkerResult {
    let mut counters = WorkerResult::default();
    let mut buf = vec![0u8; READ_BUF_LEN];

    loop {
        if deadline.is_expired() {
            return counters.settle();
        }

        match attempt(config, &deadline, &mut buf, &mut counters.bytes).await {
            Outcome::Succeeded => counters.succeeded += 1,
            Outcome::Failed => counters.failed += 1,
            Outcome::Interrupted => {}
        }
    }
}

async fn attempt(
    config: &WorkerConfig,
    deadline: &Deadline,
    buf: &mut [u8],
    bytes: &mut u64,
) -> Outcome {
    let connecting = connector::connect(&config.host, config.port, config.io_timeout);
    let mut stream = match deadline.race(connecting).await {
        None => return Outcome::Interrupted,
        Some(Err(e)) => return fail(Phase::Connecting, e),
        Some(Ok(stream)) => stream,
    };

    let sending = time::timeout(config.io_timeout, stream.write_all(&config.request));
    match deadline.race(sending).await {
        None => return Outcome::Interrupted,
        Some(Err(_)) => return fail(Phase::Sending, "write timed out"),
        Some(Ok(Err(e))) => return fail(Phase::Sending, e),
        Some(Ok(Ok(()))) => {}
    }

    if config.protocol == HttpVersion::Http09 {
        if let Err(e) = connector::half_close(&stream) {
            return fail(Phase::HalfClosing, e);
        }
    }

    if config.wait_for_response {
        if let Some(outcome) = receive(&mut stream, deadline, buf, bytes).await {
            return outcome;
        }
    }

    match connector::close(stream) {
        Ok(()) => Outcome::Succeeded,
        Err(e) => fail(Phase::Closing, e),
    }
}

/// Reads until the peer closes. Returns `Some` when the request ended early.
async fn receive(
    stream: &mut TcpStream,
    deadline: &Deadline,
    buf: &mut [u8],
    bytes: &mut u64,
) -> Option<Outcome> {
    loop {
        match deadline.race(stream.read(buf)).await {
            None => return Some(Outcome::Interrupted),
            Some(Ok(0)) => return None,
            Some(Ok(n)) => *bytes += n as u64,
            Some(Err(e)) => return Some(fail(Phase::Receiving, e)),
        }
    }
}
