//! Resilience patterns for outbound requests
//!
//! This module provides the generic building blocks the execution engine is
//! assembled from:
//! - **Rate limiting**: a fixed-window token bucket behind the
//!   [`RateLimiter`] trait
//! - **Retry policy**: attempt limits and backoff strategies
//! - **Cancellable sleep**: every suspension point honours a
//!   [`CancellationToken`]

pub mod rate_limiter;
pub mod retry;

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use rate_limiter::{FixedWindowLimiter, RateLimiter, RateLimiterConfig};
pub use retry::{
    BackoffStrategy, InvalidRetryConfig, RetryConfig, RetryConfigBuilder, RetryDecision,
};

/// The caller's cancellation token fired while waiting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Sleep for `duration` unless `cancel` fires first.
///
/// # Errors
/// Returns [`Cancelled`] if the token is already cancelled or fires during
/// the sleep.
pub async fn sleep_or_cancel(
    cancel: &CancellationToken,
    duration: Duration,
) -> Result<(), Cancelled> {
    if cancel.is_cancelled() {
        return Err(Cancelled);
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Cancelled),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}
