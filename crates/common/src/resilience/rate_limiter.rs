//! Rate limiting for outbound API requests
//!
//! [`FixedWindowLimiter`] is a token bucket that refills completely at each
//! window boundary: up to `max_tokens` admissions per `window`. The lock
//! covers only the refill-check-decrement step; callers that find the bucket
//! empty sleep outside the lock until the window ends and then try again.
//!
//! Time comes from `tokio::time`, so tests can drive the limiter with a
//! paused clock.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{sleep_or_cancel, Cancelled};

/// Admission control for outbound requests
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Block until a request may proceed.
    ///
    /// # Errors
    /// Returns [`Cancelled`] if `cancel` fires before a token is granted; no
    /// token is consumed in that case.
    async fn wait(&self, cancel: &CancellationToken) -> Result<(), Cancelled>;

    /// Tokens that would be available right now; a snapshot that may be
    /// stale by the time the caller acts on it.
    fn available(&self) -> u64;
}

/// Configuration for the fixed-window limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Admissions per window
    pub max_tokens: u64,
    /// Window length; the bucket refills completely when it elapses
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self { max_tokens: 300, window: Duration::from_secs(60) }
    }
}

impl RateLimiterConfig {
    /// Validate the configuration
    ///
    /// # Errors
    /// Returns a description of the invalid field
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        if self.window.is_zero() {
            return Err("window must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[derive(Debug)]
struct WindowState {
    tokens: u64,
    window_start: Instant,
}

/// Fixed-window token bucket
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use tokio_util::sync::CancellationToken;
/// use upwork_common::resilience::{FixedWindowLimiter, RateLimiter};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let limiter = FixedWindowLimiter::new(300, Duration::from_secs(60))?;
/// limiter.wait(&CancellationToken::new()).await?;
/// assert_eq!(limiter.available(), 299);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FixedWindowLimiter {
    config: RateLimiterConfig,
    state: Mutex<WindowState>,
}

impl FixedWindowLimiter {
    /// Create a limiter admitting `max_tokens` requests per `window`
    ///
    /// # Errors
    /// Returns error if either value is zero
    pub fn new(max_tokens: u64, window: Duration) -> Result<Self, String> {
        Self::from_config(RateLimiterConfig { max_tokens, window })
    }

    /// Create a limiter from a configuration
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn from_config(config: RateLimiterConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(WindowState { tokens: config.max_tokens, window_start: Instant::now() }),
            config,
        })
    }

    /// Create a limiter admitting `requests` per minute
    ///
    /// # Errors
    /// Returns error if `requests` is zero
    pub fn per_minute(requests: u64) -> Result<Self, String> {
        Self::new(requests, Duration::from_secs(60))
    }

    #[must_use]
    pub const fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Take a token if one is available, otherwise report how long until the
    /// current window ends.
    fn try_acquire(&self) -> Result<(), Duration> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.window_start);

        if elapsed >= self.config.window {
            state.tokens = self.config.max_tokens;
            state.window_start = now;
        }

        if state.tokens > 0 {
            state.tokens -= 1;
            Ok(())
        } else {
            Err(self.config.window.saturating_sub(elapsed))
        }
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn wait(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        loop {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }

            let remaining = match self.try_acquire() {
                Ok(()) => return Ok(()),
                Err(remaining) => remaining,
            };

            debug!(
                wait_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                max_tokens = self.config.max_tokens,
                "rate limit window exhausted, waiting"
            );
            sleep_or_cancel(cancel, remaining).await?;
        }
    }

    fn available(&self) -> u64 {
        let state = self.state.lock();
        if Instant::now().saturating_duration_since(state.window_start) >= self.config.window {
            self.config.max_tokens
        } else {
            state.tokens
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(FixedWindowLimiter::new(0, Duration::from_secs(1)).is_err());
        assert!(FixedWindowLimiter::new(10, Duration::ZERO).is_err());
        assert!(FixedWindowLimiter::per_minute(300).is_ok());
        assert_eq!(RateLimiterConfig::default().max_tokens, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_available_decrements_and_refills() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_millis(100)).unwrap();
        let cancel = CancellationToken::new();

        assert_eq!(limiter.available(), 3);
        limiter.wait(&cancel).await.unwrap();
        limiter.wait(&cancel).await.unwrap();
        assert_eq!(limiter.available(), 1);

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(limiter.available(), 3);
    }

    /// With capacity 2 per 100ms, five simultaneous callers are admitted two
    /// at t0, two at t0+100ms and the last at t0+200ms.
    #[tokio::test(start_paused = true)]
    async fn test_burst_is_spread_across_windows() {
        let limiter = Arc::new(FixedWindowLimiter::new(2, Duration::from_millis(100)).unwrap());
        let start = Instant::now();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.wait(&CancellationToken::new()).await.unwrap();
                    start.elapsed()
                })
            })
            .collect();

        let mut admitted = Vec::new();
        for handle in handles {
            admitted.push(handle.await.unwrap());
        }
        admitted.sort();

        let window = Duration::from_millis(100);
        assert_eq!(admitted.iter().filter(|t| **t < window).count(), 2);
        assert_eq!(admitted.iter().filter(|t| **t >= window && **t < window * 2).count(), 2);
        assert_eq!(admitted.iter().filter(|t| **t >= window * 2).count(), 1);
        assert!(admitted.iter().all(|t| *t < window * 3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_is_cancellable_and_consumes_nothing() {
        let limiter = Arc::new(FixedWindowLimiter::new(1, Duration::from_secs(60)).unwrap());
        let cancel = CancellationToken::new();
        limiter.wait(&cancel).await.unwrap();
        assert_eq!(limiter.available(), 0);

        let waiter = {
            let limiter = Arc::clone(&limiter);
            let cancel = cancel.clone();
            tokio::spawn(async move { limiter.wait(&cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        assert_eq!(waiter.await.unwrap(), Err(Cancelled));
        assert_eq!(limiter.available(), 0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_wait_fails_immediately() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(1)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(limiter.wait(&cancel).await, Err(Cancelled));
        assert_eq!(limiter.available(), 5);
    }
}
