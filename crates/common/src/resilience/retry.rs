//! Retry configuration and backoff strategies
//!
//! The execution engine owns the retry loop itself; this module supplies the
//! policy knobs it reads: how many attempts to make and how long to wait
//! between them.

use std::time::Duration;

use thiserror::Error;

/// The retry configuration is invalid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid retry configuration: {message}")]
pub struct InvalidRetryConfig {
    pub message: String,
}

/// How long to wait before the next attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the default backoff delay
    Retry,
    /// Retry the operation after at least this delay
    RetryAfter(Duration),
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Linear backoff: initial_delay + (attempt * increment)
    Linear { initial_delay: Duration, increment: Duration },
    /// Exponential backoff: initial_delay * 2^(attempt - 1), capped at
    /// max_delay
    Exponential { initial_delay: Duration, max_delay: Duration },
}

impl BackoffStrategy {
    /// `attempt * base`: 1x base after the first failure, 2x after the
    /// second, and so on.
    #[must_use]
    pub const fn linear(base: Duration) -> Self {
        Self::Linear { initial_delay: Duration::ZERO, increment: base }
    }

    /// Calculate the delay after the given (1-based) failed attempt
    #[must_use]
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Linear { initial_delay, increment } => {
                initial_delay.saturating_add(increment.saturating_mul(attempt))
            }
            Self::Exponential { initial_delay, max_delay } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                initial_delay.saturating_mul(factor).min(*max_delay)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::linear(Duration::from_secs(1))
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Backoff strategy to use
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, backoff: BackoffStrategy::default() }
    }
}

impl RetryConfig {
    /// Create a new retry configuration builder
    #[must_use]
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the retry configuration
    ///
    /// # Errors
    /// Returns error if `max_attempts` is zero
    pub fn validate(&self) -> Result<(), InvalidRetryConfig> {
        if self.max_attempts == 0 {
            return Err(InvalidRetryConfig {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Whether another attempt may follow `attempt`
    #[must_use]
    pub const fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before the attempt that follows `attempt`, honouring a
    /// server-provided minimum.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, decision: RetryDecision) -> Duration {
        let backoff = self.backoff.calculate_delay(attempt);
        match decision {
            RetryDecision::RetryAfter(minimum) => backoff.max(minimum),
            RetryDecision::Retry => backoff,
        }
    }
}

/// Builder for retry configuration
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    #[must_use]
    pub fn linear_backoff(mut self, base: Duration) -> Self {
        self.config.backoff = BackoffStrategy::linear(base);
        self
    }

    #[must_use]
    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, max_delay };
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn build(self) -> Result<RetryConfig, InvalidRetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
