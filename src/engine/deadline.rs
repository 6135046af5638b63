use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};

/// Wall-clock point at which a worker stops issuing requests. Set once when
/// the worker starts and never moved afterwards, so expiry flips from false
/// to true exactly once.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn start(duration: Duration) -> Self {
        Self {
            at: Instant::now() + duration,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Resolves once the deadline has passed.
    pub async fn expired(&self) {
        time::sleep_until(self.at).await
    }

    /// Drives `fut` until it completes or the deadline passes, whichever
    /// comes first. `None` means the deadline won.
    pub async fn race<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.expired() => None,
            out = fut => Some(out),
        }
    }
}
