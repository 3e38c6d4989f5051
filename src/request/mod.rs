//! Request governance for outbound API calls
//!
//! Every call to the game API goes through the same two gates: a fixed-window
//! `RateLimiter` that bounds how many requests leave per second, and a
//! `RetryPolicy` that retries transient failures with exponential backoff.
//! Responses are memoized separately by `crate::cache::ResponseCache`.

mod rate_limiter;
mod retry;

pub use rate_limiter::{RateLimiter, DEFAULT_REQUESTS_PER_SECOND};
pub use retry::{RetryPolicy, DEFAULT_INITIAL_WAIT, DEFAULT_MAX_RETRIES};
