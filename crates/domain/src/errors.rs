//! Error types used throughout the client
//!
//! Every failure surfaced by the pipeline is an [`UpworkError`]. Callers
//! branch on [`ErrorKind`] rather than on message text; the engine wraps the
//! final error in an [`ExecutionError`] that records how many attempts were
//! made.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::graphql::GraphQLErrors;

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Cancelled,
    Authentication,
    Permission,
    RateLimit,
    Validation,
    Server,
    Network,
    GraphQL,
    Protocol,
    Client,
    Config,
}

impl ErrorKind {
    /// Stable label used in structured logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Authentication => "authentication",
            Self::Permission => "permission",
            Self::RateLimit => "rate_limit",
            Self::Validation => "validation",
            Self::Server => "server",
            Self::Network => "network",
            Self::GraphQL => "graphql",
            Self::Protocol => "protocol",
            Self::Client => "client",
            Self::Config => "config",
        }
    }

    /// Transient kinds: network failures, 5xx responses and 429 throttling.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server | Self::RateLimit)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the Upwork client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpworkError {
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Authentication error: {message}")]
    Authentication { status: Option<u16>, message: String },

    #[error("Permission denied: {message}")]
    Permission { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimited { message: String, retry_after: Option<Duration> },

    #[error("Validation error: {}", describe_field(.field, .message))]
    Validation { field: Option<String>, message: String },

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Client error (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("GraphQL error: {0}")]
    GraphQL(GraphQLErrors),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn describe_field(field: &Option<String>, message: &str) -> String {
    match field.as_deref() {
        Some(field) if !field.is_empty() => format!("{field}: {message}"),
        _ => message.to_string(),
    }
}

impl UpworkError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Permission { .. } => ErrorKind::Permission,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Server { .. } => ErrorKind::Server,
            Self::Client { .. } => ErrorKind::Client,
            Self::Network(_) => ErrorKind::Network,
            Self::GraphQL(_) => ErrorKind::GraphQL,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// HTTP status that produced this error, when there was one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } => *status,
            Self::Permission { .. } => Some(403),
            Self::RateLimited { .. } => Some(429),
            Self::Server { status, .. } | Self::Client { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided `Retry-After` hint on throttled responses.
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub const fn graphql_errors(&self) -> Option<&GraphQLErrors> {
        match self {
            Self::GraphQL(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled(reason.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication { status: None, message: message.into() }
    }
}

/// GraphQL error lists map to `Validation` when the server flags the first
/// error as a validation failure, and to `GraphQL` otherwise.
impl From<GraphQLErrors> for UpworkError {
    fn from(errors: GraphQLErrors) -> Self {
        match errors.first() {
            Some(first) if first.is_validation() => {
                let path = first.path_string();
                Self::Validation {
                    field: (!path.is_empty()).then_some(path),
                    message: errors.to_string(),
                }
            }
            _ => Self::GraphQL(errors),
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, UpworkError>;

/// Terminal failure of an execution, annotated with the number of attempts.
///
/// An attempt is counted once it passes the cancellation check at the top of
/// the retry loop, so an execution cancelled before it started reports zero.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{source} (after {attempts} attempt(s))")]
pub struct ExecutionError {
    pub attempts: u32,
    pub source: UpworkError,
}

impl ExecutionError {
    pub const fn new(attempts: u32, source: UpworkError) -> Self {
        Self { attempts, source }
    }

    pub const fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub const fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }

    pub fn into_inner(self) -> UpworkError {
        self.source
    }
}
