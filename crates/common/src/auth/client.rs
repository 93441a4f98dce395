//! OAuth 2.0 client for the Upwork authorization server
//!
//! Handles the grant flows used by the API client:
//! - Browser authorization URL building
//! - Authorization code exchange
//! - Token refresh
//! - Client credentials (machine-to-machine)
//!
//! Token endpoint calls authenticate the client with HTTP Basic auth and
//! honour a [`CancellationToken`]: a cancelled token fails the call before
//! any I/O, and cancelling mid-flight aborts the request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::traits::OAuthClientTrait;
use super::types::{
    Credential, GrantType, OAuthConfig, OAuthErrorKind, OAuthErrorResponse, TokenResponse,
};

const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for OAuth client operations
#[derive(Debug, Error)]
pub enum OAuthClientError {
    /// The caller cancelled the operation
    #[error("OAuth request cancelled")]
    Cancelled,

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// OAuth server rejected the request
    #[error("OAuth error {kind} (HTTP {status}): {message}")]
    OAuth { kind: OAuthErrorKind, status: u16, message: String },

    /// Failed to parse a successful response
    #[error("Parse error: {0}")]
    ParseError(String),

    /// No refresh token available
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Invalid configuration or unsupported flow
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl OAuthClientError {
    /// RFC 6749 error kind, when the server returned one.
    #[must_use]
    pub const fn kind(&self) -> Option<OAuthErrorKind> {
        match self {
            Self::OAuth { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    fn from_error_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<OAuthErrorResponse>(body) {
            Ok(error) => Self::OAuth {
                kind: OAuthErrorKind::from_code(&error.error, status),
                status,
                message: error.to_string(),
            },
            Err(_) => Self::OAuth {
                kind: OAuthErrorKind::from_status(status),
                status,
                message: if body.trim().is_empty() {
                    format!("token endpoint returned HTTP {status}")
                } else {
                    body.trim().to_string()
                },
            },
        }
    }
}

/// OAuth 2.0 client
///
/// Stateless apart from its configuration: every grant returns a fresh
/// [`Credential`] and leaves storage to the caller.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    client: Client,
}

impl OAuthClient {
    /// Create a new OAuth client with the given configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    ///
    /// # Examples
    /// ```
    /// use upwork_common::auth::{OAuthClient, OAuthConfig};
    ///
    /// let config = OAuthConfig::new("client_id", "client_secret", "https://app.example.com/cb");
    /// let client = OAuthClient::new(config).unwrap();
    /// let url = client.authorization_url("state-123");
    /// assert!(url.contains("state=state-123"));
    /// ```
    pub fn new(config: OAuthConfig) -> Result<Self, OAuthClientError> {
        let client = Client::builder().timeout(TOKEN_REQUEST_TIMEOUT).build()?;
        Ok(Self { config, client })
    }

    /// Create a client that shares an existing connection pool
    #[must_use]
    pub const fn with_http_client(config: OAuthConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Build the browser authorization URL
    ///
    /// Deterministic for a given configuration and `state`; the scope
    /// parameter is omitted when no scopes are configured.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> String {
        let scope = self.config.scope_string();

        let mut params = vec![
            ("response_type", self.config.grant_type.response_type()),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("state", state),
        ];
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if self.config.authorization_url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query_string}", self.config.authorization_url)
    }

    /// Exchange an authorization code for a credential
    ///
    /// # Errors
    /// Returns error if cancelled, the request fails, or the server rejects
    /// the code
    pub async fn exchange_code(
        &self,
        cancel: &CancellationToken,
        code: &str,
    ) -> Result<Credential, OAuthClientError> {
        if code.is_empty() {
            return Err(OAuthClientError::ConfigError("authorization code is empty".to_string()));
        }

        let params = vec![
            ("grant_type", GrantType::AuthorizationCode.as_str().to_string()),
            ("code", code.to_string()),
            ("redirect_uri", self.config.redirect_uri.clone()),
        ];

        let credential = self.request_token(cancel, &params, true).await?;
        info!(grant_type = "authorization_code", "oauth authorization code exchanged");
        Ok(credential)
    }

    /// Refresh an access token
    ///
    /// When the server does not rotate the refresh token, the one passed in
    /// is kept on the returned credential.
    ///
    /// # Errors
    /// Returns error if cancelled, the refresh token is empty or revoked, or
    /// the request fails
    pub async fn refresh_token(
        &self,
        cancel: &CancellationToken,
        refresh_token: &str,
    ) -> Result<Credential, OAuthClientError> {
        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }

        let params = vec![
            ("grant_type", GrantType::RefreshToken.as_str().to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];

        let mut credential = self.request_token(cancel, &params, true).await?;
        if credential.refresh_token.is_none() {
            credential.refresh_token = Some(refresh_token.to_string());
        }

        info!(
            grant_type = "refresh_token",
            expires_in_secs = credential.seconds_until_expiry(),
            "oauth access token refreshed"
        );
        Ok(credential)
    }

    /// Obtain a credential with the client credentials grant
    ///
    /// # Errors
    /// Returns a configuration error unless the client is configured for the
    /// `client_credentials` grant, or any token endpoint failure
    pub async fn client_credentials(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Credential, OAuthClientError> {
        if self.config.grant_type != GrantType::ClientCredentials {
            return Err(OAuthClientError::ConfigError(format!(
                "client_credentials grant requires grant_type=client_credentials, configured: {}",
                self.config.grant_type
            )));
        }

        let params = vec![
            ("grant_type", GrantType::ClientCredentials.as_str().to_string()),
            ("scope", self.config.scope_string()),
            ("client_id", self.config.client_id.clone()),
            ("client_secret", self.config.client_secret.clone()),
        ];

        let credential = self.request_token(cancel, &params, false).await?;
        info!(grant_type = "client_credentials", "oauth client credentials obtained");
        Ok(credential)
    }

    /// Get the configured redirect URI
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    /// Get a reference to the OAuth configuration
    #[must_use]
    pub const fn config(&self) -> &OAuthConfig {
        &self.config
    }

    async fn request_token(
        &self,
        cancel: &CancellationToken,
        params: &[(&str, String)],
        basic_auth: bool,
    ) -> Result<Credential, OAuthClientError> {
        if cancel.is_cancelled() {
            return Err(OAuthClientError::Cancelled);
        }

        let mut request = self.client.post(&self.config.token_url).form(params);
        if basic_auth {
            request = request.basic_auth(&self.config.client_id, Some(&self.config.client_secret));
        }

        debug!(token_url = %self.config.token_url, "requesting oauth token");

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(OAuthClientError::Cancelled),
            result = request.send() => result?,
        };

        let status = response.status();
        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(OAuthClientError::Cancelled),
            result = response.text() => result?,
        };

        if !status.is_success() {
            let error = OAuthClientError::from_error_body(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %error, "oauth token request rejected");
            return Err(error);
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| OAuthClientError::ParseError(e.to_string()))?;
        if token_response.access_token.is_empty() {
            return Err(OAuthClientError::ParseError(
                "token response contains an empty access_token".to_string(),
            ));
        }

        Ok(token_response.into())
    }
}

// Implement OAuthClientTrait for OAuthClient
#[async_trait]
impl OAuthClientTrait for OAuthClient {
    fn authorization_url(&self, state: &str) -> String {
        self.authorization_url(state)
    }

    async fn exchange_code(
        &self,
        cancel: &CancellationToken,
        code: &str,
    ) -> Result<Credential, OAuthClientError> {
        self.exchange_code(cancel, code).await
    }

    async fn refresh_token(
        &self,
        cancel: &CancellationToken,
        refresh_token: &str,
    ) -> Result<Credential, OAuthClientError> {
        self.refresh_token(cancel, refresh_token).await
    }

    async fn client_credentials(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Credential, OAuthClientError> {
        self.client_credentials(cancel).await
    }
}
