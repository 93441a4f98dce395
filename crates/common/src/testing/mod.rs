//! Testing utilities and helpers
//!
//! In-memory implementations of the traits defined in this crate, for tests
//! of code that depends on them:
//! - **[`mocks::MockOAuthClient`]**: scripted grant results with call
//!   counting
//! - **[`mocks::CountingRateLimiter`]**: admits everything and records how
//!   often it was asked
//!
//! ## Usage
//!
//! ```rust
//! use upwork_common::auth::Credential;
//! use upwork_common::testing::MockOAuthClient;
//!
//! let oauth = MockOAuthClient::new();
//! oauth.push_refresh(Ok(Credential::bearer("fresh")));
//! assert_eq!(oauth.refresh_calls(), 0);
//! ```

pub mod mocks;

pub use mocks::{CountingRateLimiter, MockOAuthClient};
