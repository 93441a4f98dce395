//! Modular common utilities shared across the Upwork client crates.
//!
//! # Safety and Quality
//!
//! This crate enforces strict safety and quality standards to ensure
//! reliability across all client components.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: plain data types (credentials, OAuth configuration)
//! - `runtime`: async infrastructure (rate limiting, backoff, token store)
//! - `platform`: network integrations (OAuth2 client)
//! - `test-utils`: in-memory fakes for the traits defined here

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation + platform tiers
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod auth;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(feature = "test-utils")]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use auth::{
    validate_token, Credential, GrantType, OAuthConfig, OAuthErrorKind, TokenValidationError,
};
#[cfg(feature = "runtime")]
pub use auth::TokenStore;
#[cfg(feature = "platform")]
pub use auth::{OAuthClient, OAuthClientError, OAuthClientTrait};
#[cfg(feature = "runtime")]
pub use resilience::{
    sleep_or_cancel, BackoffStrategy, Cancelled, FixedWindowLimiter, RateLimiter,
    RateLimiterConfig, RetryConfig, RetryConfigBuilder, RetryDecision,
};
