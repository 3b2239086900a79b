//! Fixed-delay retry for content source requests.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy with a fixed delay between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub retries: u32,
    /// Delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
    /// Upper bound on a single attempt in seconds.
    pub attempt_timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_ms: 1000,
            attempt_timeout_secs: 10,
        }
    }
}

/// Outcome of [`RetryPolicy::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Success { value: T, attempts: u32 },
    Exhausted { last_error: String, attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            RetryOutcome::Success { value, .. } => Some(value),
            RetryOutcome::Exhausted { .. } => None,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// Every failure is retried; an attempt exceeding the timeout counts as
    /// failed. Sleeps between attempts, never after the last one.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.retries.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let last_error = match tokio::time::timeout(self.attempt_timeout(), operation()).await {
                Ok(Ok(value)) => return RetryOutcome::Success { value, attempts },
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("attempt timed out after {}s", self.attempt_timeout_secs),
            };

            warn!(attempt = attempts, max_attempts, error = %last_error, "Fetch attempt failed");

            if attempts >= max_attempts {
                return RetryOutcome::Exhausted {
                    last_error,
                    attempts,
                };
            }
            if self.retry_delay_ms > 0 {
                tokio::time::sleep(self.delay()).await;
            }
        }
    }
}
