//! Bounded retry with exponential backoff

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Default number of attempts made before giving up
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default wait before the second attempt
pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_secs(1);

/// Retries a fallible async operation, doubling the wait after each failure
///
/// `max_retries` is the total number of attempts, not the number of retries
/// after the first one. The caller is suspended between attempts but never
/// after the last one, and the last attempt's error is returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts made before the last error is returned
    pub max_retries: u32,
    /// Wait after the first failed attempt
    pub initial_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_wait: DEFAULT_INITIAL_WAIT,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt count and initial wait
    pub fn new(max_retries: u32, initial_wait: Duration) -> Self {
        Self {
            max_retries,
            initial_wait,
        }
    }

    /// Runs `operation` until it succeeds or the attempts are used up
    ///
    /// A `max_retries` of 0 still makes one attempt.
    ///
    /// # Returns
    /// * `Ok(T)` from the first successful attempt
    /// * `Err(E)` from the final attempt if every attempt failed
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.max_retries.max(1);
        let mut wait = self.initial_wait;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:.2} seconds...",
                        attempt,
                        attempts,
                        e,
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
                    wait = wait.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }
}
