//! Traits for OAuth operations
//!
//! These traits enable dependency injection and testing by abstracting the
//! authorization server.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::client::OAuthClientError;
use super::types::Credential;

/// Trait for OAuth client operations
///
/// The execution engine depends on this trait rather than on
/// [`OAuthClient`](super::OAuthClient) so refresh behavior can be faked in
/// tests.
#[async_trait]
pub trait OAuthClientTrait: Send + Sync {
    /// Build the browser authorization URL for `state`
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange authorization code for a credential
    ///
    /// # Errors
    /// Returns error if cancelled, the exchange fails, or the response cannot
    /// be parsed
    async fn exchange_code(
        &self,
        cancel: &CancellationToken,
        code: &str,
    ) -> Result<Credential, OAuthClientError>;

    /// Refresh access token using refresh token
    ///
    /// # Errors
    /// Returns error if cancelled, or the token is invalid/revoked
    async fn refresh_token(
        &self,
        cancel: &CancellationToken,
        refresh_token: &str,
    ) -> Result<Credential, OAuthClientError>;

    /// Obtain a credential with the client credentials grant
    ///
    /// # Errors
    /// Returns error if the grant is not configured or the request fails
    async fn client_credentials(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Credential, OAuthClientError>;
}
