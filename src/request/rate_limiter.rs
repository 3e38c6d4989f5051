//! Fixed-window rate limiter
//!
//! Grants at most `budget` permissions per one-second window. The window is
//! coarse: a full budget may be spent in a burst right after a reset, and the
//! limiter only starts waiting once the window is exhausted.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default number of requests allowed per second
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 20;

/// Length of one rate window
const WINDOW: Duration = Duration::from_secs(1);

/// Mutable window state shared by all callers
#[derive(Debug)]
struct Window {
    /// When the current window opened
    start: Instant,
    /// Permissions granted in the current window
    request_count: u32,
}

/// Throttles a stream of requests to a fixed per-second budget
///
/// The window state sits behind an async mutex that is held while a caller
/// waits for the window to roll over, so concurrent callers are served one at
/// a time in the order they asked.
#[derive(Debug)]
pub struct RateLimiter {
    budget: u32,
    window: Mutex<Window>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_SECOND)
    }
}

impl RateLimiter {
    /// Creates a limiter allowing `requests_per_second` grants per window
    ///
    /// A budget of 0 is treated as 1.
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            budget: requests_per_second.max(1),
            window: Mutex::new(Window {
                start: Instant::now(),
                request_count: 0,
            }),
        }
    }

    /// Returns the per-second budget
    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Waits until another request may be sent, then records it
    ///
    /// Never fails; it may only delay the caller until the current window ends.
    pub async fn acquire(&self) {
        let mut window = self.window.lock().await;
        let now = Instant::now();

        if now.duration_since(window.start) >= WINDOW {
            window.start = now;
            window.request_count = 0;
        }

        if window.request_count >= self.budget {
            let remaining = (window.start + WINDOW).saturating_duration_since(now);
            if !remaining.is_zero() {
                tracing::debug!(
                    wait_ms = remaining.as_millis() as u64,
                    budget = self.budget,
                    "Rate limit reached, waiting for next window"
                );
                tokio::time::sleep(remaining).await;
                window.start = Instant::now();
                window.request_count = 0;
            }
        }

        window.request_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_default_budget() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.budget(), DEFAULT_REQUESTS_PER_SECOND);
    }

    #[test]
    fn test_zero_budget_is_clamped() {
        let limiter = RateLimiter::new(0);
        assert_eq!(limiter.budget(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_budget_does_not_wait() {
        let limiter = RateLimiter::new(10);
        let start = Instant::now();

        for _ in 0..10 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_twenty_calls_at_budget_ten_take_a_second() {
        let limiter = RateLimiter::new(10);
        let start = Instant::now();

        for _ in 0..20 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_twenty_five_calls_at_budget_twenty_take_a_second() {
        let limiter = RateLimiter::new(20);
        let start = Instant::now();

        for _ in 0..25 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_time_grows_with_each_exhausted_window() {
        let limiter = RateLimiter::new(5);
        let start = Instant::now();

        // floor((16 - 1) / 5) = 3 full windows
        for _ in 0..16 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_idle_second() {
        let limiter = RateLimiter::new(2);
        limiter.acquire().await;
        limiter.acquire().await;

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_the_budget() {
        let limiter = Arc::new(RateLimiter::new(4));
        let start = Instant::now();

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for handle in handles {
            handle.await.expect("acquire task panicked");
        }

        // 12 grants at 4 per window need at least two rollovers
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
