//! Client configuration
//!
//! `ClientConfig` is an immutable snapshot: changing the organization id
//! produces a new value via [`ClientConfig::with_organization_id`] instead of
//! mutating shared state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_RATE_LIMIT_PER_MINUTE,
    DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use crate::errors::UpworkError;

/// API client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    /// Sent as the tenant header when set.
    pub organization_id: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub rate_limit: RateLimitSettings,
    pub retry: RetrySettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            organization_id: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            rate_limit: RateLimitSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl ClientConfig {
    /// Copy of this configuration acting on behalf of `organization_id`.
    #[must_use]
    pub fn with_organization_id(&self, organization_id: impl Into<String>) -> Self {
        let organization_id = organization_id.into();
        Self {
            organization_id: (!organization_id.is_empty()).then_some(organization_id),
            ..self.clone()
        }
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`UpworkError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), UpworkError> {
        let url = url::Url::parse(&self.api_url)
            .map_err(|e| UpworkError::Config(format!("invalid api_url '{}': {e}", self.api_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(UpworkError::Config(format!(
                "api_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(UpworkError::Config("timeout_secs must be greater than 0".to_string()));
        }
        self.rate_limit.validate()?;
        self.retry.validate()
    }
}

/// Fixed-window rate limit: `max_requests` per `window_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_requests: u64,
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_PER_MINUTE,
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
        }
    }
}

impl RateLimitSettings {
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    fn validate(&self) -> Result<(), UpworkError> {
        if self.max_requests == 0 {
            return Err(UpworkError::Config(
                "rate_limit.max_requests must be greater than 0".to_string(),
            ));
        }
        if self.window_secs == 0 {
            return Err(UpworkError::Config(
                "rate_limit.window_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Retry policy applied by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Backoff before retry `n` is `n * base_delay_ms`.
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, base_delay_ms: DEFAULT_BASE_DELAY_MS }
    }
}

impl RetrySettings {
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    fn validate(&self) -> Result<(), UpworkError> {
        if self.max_attempts == 0 {
            return Err(UpworkError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}
