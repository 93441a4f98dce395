//! Tracing subscriber initialisation

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the global subscriber
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Install a fmt subscriber filtered by `RUST_LOG`, or by `default_filter`
/// when `RUST_LOG` is unset or unparseable.
///
/// # Errors
///
/// Returns [`ObservabilityError::InvalidFilter`] if `default_filter` is not a
/// valid directive, or [`ObservabilityError::Init`] if a global subscriber is
/// already installed.
pub fn init_tracing(default_filter: &str) -> Result<(), ObservabilityError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| {
            ObservabilityError::InvalidFilter {
                filter: default_filter.to_string(),
                message: e.to_string(),
            }
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| ObservabilityError::Init(e.to_string()))
}
