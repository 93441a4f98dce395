//! API constants
//!
//! Centralized location for the endpoint, header and default values used by
//! the request pipeline.

// Endpoint
pub const DEFAULT_API_URL: &str = "https://api.upwork.com/graphql";

/// Header carrying the organization (tenant) a request acts on behalf of.
pub const TENANT_HEADER: &str = "X-Upwork-API-TenantId";

pub const DEFAULT_USER_AGENT: &str = concat!("upwork-rs/", env!("CARGO_PKG_VERSION"));

// Transport defaults
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Retry defaults
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

// Rate limiting (vendor limit: 300 requests per minute)
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u64 = 300;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

// GraphQL error extension codes treated as validation failures
pub const VALIDATION_ERROR_CODES: &[&str] =
    &["GRAPHQL_VALIDATION_FAILED", "BAD_USER_INPUT", "VALIDATION_ERROR", "ValidationError"];
