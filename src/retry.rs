//! Bounded exponential-backoff retry for transient I/O failures.
//!
//! Every filesystem read and write in the pipeline goes through a
//! [`RetryPolicy`]. The policy is an explicit value rather than a process
//! global so tests can run with a zero backoff and no sleeping.

use anyhow::Result;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::RetryConfig;

/// Marker error for a cooperative stop.
///
/// Callers downcast with `err.is::<Cancelled>()` to tell "I chose to stop"
/// apart from "I failed".
#[derive(Debug, Clone, Copy)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation cancelled")
    }
}

impl std::error::Error for Cancelled {}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base(),
        }
    }

    /// Run `op`, retrying on any I/O error with exponential backoff.
    ///
    /// The cancellation token is observed before every attempt and during
    /// the backoff sleep; a cancelled run surfaces as [`Cancelled`]. When
    /// attempts are exhausted the last I/O error escalates unmodified.
    pub async fn run<T, F, Fut>(&self, token: &CancellationToken, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::io::Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if token.is_cancelled() {
                return Err(Cancelled.into());
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "I/O operation failed, retrying"
                    );
                    tokio::select! {
                        _ = token.cancelled() => return Err(Cancelled.into()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}
