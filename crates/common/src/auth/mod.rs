//! OAuth 2.0 authentication for the Upwork API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  OAuthClient    │  Grant flows against the token endpoint
//! └────────┬────────┘
//!          │ Credential
//!          ▼
//! ┌─────────────────┐
//! │  TokenStore     │  Atomic snapshot storage read by every request
//! └─────────────────┘
//! ```
//!
//! Tiers: the credential and configuration types are available with
//! `foundation`, the store with `runtime`, and the HTTP client with
//! `platform`.
//!
//! # Usage Example
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use upwork_common::auth::{OAuthClient, OAuthConfig, TokenStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OAuthConfig::new("client_id", "client_secret", "https://app.example.com/cb");
//! let client = OAuthClient::new(config)?;
//! let store = TokenStore::new();
//!
//! // Send the user to this URL, then receive `code` on the redirect
//! let url = client.authorization_url("csrf-state");
//! # let _ = url;
//! # let code = "code";
//!
//! let cancel = CancellationToken::new();
//! store.set(client.exchange_code(&cancel, code).await?);
//! # Ok(())
//! # }
//! ```

pub mod types;

#[cfg(feature = "runtime")]
pub mod token_store;

#[cfg(feature = "platform")]
pub mod client;
#[cfg(feature = "platform")]
pub mod traits;

pub use types::{
    scopes, validate_token, Credential, GrantType, OAuthConfig, OAuthErrorKind,
    OAuthErrorResponse, TokenResponse, TokenValidationError, BEARER, DEFAULT_AUTHORIZATION_URL,
    DEFAULT_TOKEN_URL,
};

#[cfg(feature = "runtime")]
pub use token_store::TokenStore;

#[cfg(feature = "platform")]
pub use client::{OAuthClient, OAuthClientError};
#[cfg(feature = "platform")]
pub use traits::OAuthClientTrait;
