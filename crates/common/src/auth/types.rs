//! OAuth 2.0 types and structures
//!
//! Defines the credential held by the token store, the token endpoint's
//! response and error formats, and the client configuration for the Upwork
//! authorization server.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upwork authorization endpoint (browser redirect target)
pub const DEFAULT_AUTHORIZATION_URL: &str =
    "https://www.upwork.com/ab/account-security/oauth2/authorize";

/// Upwork token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://www.upwork.com/api/v3/oauth2/token";

/// The only token type the API accepts
pub const BEARER: &str = "Bearer";

/// OAuth 2.0 credential used to authenticate API requests
///
/// A credential is usable when its access token is non-empty and its token
/// type is `Bearer`. A credential without `expires_at` never expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token sent with every API request
    pub access_token: String,

    /// Refresh token for obtaining new access tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type (always "Bearer" for the Upwork API)
    pub token_type: String,

    /// Absolute expiration timestamp (UTC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Granted scopes (space-separated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Credential {
    /// Create a bearer credential with no refresh token and no expiry
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: BEARER.to_string(),
            expires_at: None,
            scope: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Expires `expires_in` seconds from now; non-positive values mean "no
    /// expiry".
    #[must_use]
    pub fn expiring_in(self, expires_in: i64) -> Self {
        if expires_in > 0 {
            self.with_expiry(Utc::now() + chrono::Duration::seconds(expires_in))
        } else {
            self
        }
    }

    /// Check if the access token is expired
    ///
    /// # Returns
    /// `true` if an expiry is set and lies in the past, `false` otherwise
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() >= expires_at)
    }

    /// Get seconds until token expiration
    ///
    /// # Returns
    /// `Some(seconds)` if expiry is set, `None` if no expiry timestamp exists
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at.map(|expires_at| (expires_at - Utc::now()).num_seconds())
    }

    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|token| !token.is_empty())
    }

    /// `Authorization` header value.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Reasons a credential cannot be used for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenValidationError {
    #[error("no credential available")]
    Missing,

    #[error("access token is empty")]
    EmptyAccessToken,

    #[error("unsupported token type (expected Bearer)")]
    InvalidTokenType,

    #[error("access token expired and no refresh token is available")]
    ExpiredWithoutRefresh,
}

/// Validate a credential before use.
///
/// An expired credential that still carries a refresh token passes: the
/// caller is expected to refresh it.
///
/// # Errors
///
/// Returns the first [`TokenValidationError`] that applies.
pub fn validate_token(credential: Option<&Credential>) -> Result<(), TokenValidationError> {
    let credential = credential.ok_or(TokenValidationError::Missing)?;
    if credential.access_token.is_empty() {
        return Err(TokenValidationError::EmptyAccessToken);
    }
    if credential.token_type != BEARER {
        return Err(TokenValidationError::InvalidTokenType);
    }
    if credential.is_expired() && !credential.can_refresh() {
        return Err(TokenValidationError::ExpiredWithoutRefresh);
    }
    Ok(())
}

/// OAuth token response from the authorization server
///
/// Standard OAuth 2.0 token response format (RFC 6749 §5.1).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl From<TokenResponse> for Credential {
    fn from(response: TokenResponse) -> Self {
        // Servers commonly answer "bearer"; the API only accepts "Bearer".
        let token_type = match response.token_type {
            Some(kind) if !kind.eq_ignore_ascii_case(BEARER) => kind,
            _ => BEARER.to_string(),
        };

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.filter(|token| !token.is_empty()),
            token_type,
            expires_at: None,
            scope: response.scope,
        }
        .expiring_in(response.expires_in.unwrap_or_default())
    }
}

/// OAuth 2.0 grant types supported by the authorization server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    #[default]
    AuthorizationCode,
    /// Browser-only flow returning the token in the redirect fragment
    #[serde(rename = "token")]
    Implicit,
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    /// Form value for the `grant_type` parameter
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::Implicit => "token",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// `response_type` sent on the authorization URL
    #[must_use]
    pub const fn response_type(self) -> &'static str {
        match self {
            Self::Implicit => "token",
            _ => "code",
        }
    }

    /// Parse a configuration value (`authorization_code`, `token`,
    /// `implicit`, `client_credentials`, `refresh_token`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "authorization_code" | "code" => Some(Self::AuthorizationCode),
            "token" | "implicit" => Some(Self::Implicit),
            "client_credentials" => Some(Self::ClientCredentials),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upwork permission scopes
pub mod scopes {
    pub const MESSAGES_READ: &str = "messages:read";
    pub const MESSAGES_WRITE: &str = "messages:write";
    pub const CONTRACTS_READ: &str = "contracts:read";
    pub const CONTRACTS_WRITE: &str = "contracts:write";
    pub const PROFILE_READ: &str = "profile:read";
    pub const PROFILE_WRITE: &str = "profile:write";
    pub const JOBS_READ: &str = "jobs:read";
    pub const JOBS_WRITE: &str = "jobs:write";
    pub const REPORTS_READ: &str = "reports:read";
    pub const ACTIVITIES_READ: &str = "activities:read";
    pub const ACTIVITIES_WRITE: &str = "activities:write";
    pub const METADATA_READ: &str = "metadata:read";
    pub const ORGANIZATION_READ: &str = "organization:read";
    pub const TIMESHEET_READ: &str = "timesheet:read";
    pub const SNAPSHOTS_READ: &str = "snapshots:read";
    pub const SNAPSHOTS_WRITE: &str = "snapshots:write";
    pub const PAYMENTS_WRITE: &str = "payments:write";
    pub const OFFERS_WRITE: &str = "offers:write";

    /// Scopes requested when none are configured
    #[must_use]
    pub fn default_scopes() -> Vec<String> {
        [MESSAGES_READ, CONTRACTS_READ, PROFILE_READ, JOBS_READ, ORGANIZATION_READ]
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[must_use]
    pub fn all_scopes() -> Vec<String> {
        [
            MESSAGES_READ,
            MESSAGES_WRITE,
            CONTRACTS_READ,
            CONTRACTS_WRITE,
            PROFILE_READ,
            PROFILE_WRITE,
            JOBS_READ,
            JOBS_WRITE,
            REPORTS_READ,
            ACTIVITIES_READ,
            ACTIVITIES_WRITE,
            METADATA_READ,
            ORGANIZATION_READ,
            TIMESHEET_READ,
            SNAPSHOTS_READ,
            SNAPSHOTS_WRITE,
            PAYMENTS_WRITE,
            OFFERS_WRITE,
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }
}

/// OAuth client configuration for the Upwork authorization server
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret (never serialized)
    #[serde(skip_serializing)]
    pub client_secret: String,

    /// Redirect URI registered for the application
    pub redirect_uri: String,

    /// OAuth scopes to request
    pub scopes: Vec<String>,

    /// Grant type this client is configured for
    pub grant_type: GrantType,

    /// Authorization endpoint (override for testing)
    pub authorization_url: String,

    /// Token endpoint (override for testing)
    pub token_url: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            scopes: scopes::default_scopes(),
            grant_type: GrantType::AuthorizationCode,
            authorization_url: DEFAULT_AUTHORIZATION_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("grant_type", &self.grant_type)
            .field("authorization_url", &self.authorization_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}

impl OAuthConfig {
    /// Create a configuration for the production Upwork endpoints
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_grant_type(mut self, grant_type: GrantType) -> Self {
        self.grant_type = grant_type;
        self
    }

    /// Point both endpoints at another server (used by tests)
    #[must_use]
    pub fn with_endpoints(
        mut self,
        authorization_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.authorization_url = authorization_url.into();
        self.token_url = token_url.into();
        self
    }

    /// Get scopes as space-separated string
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Check that credentials are present
    ///
    /// # Errors
    /// Returns a description of the first missing field.
    pub fn validate(&self) -> Result<(), String> {
        if self.client_id.trim().is_empty() {
            return Err("client_id is required".to_string());
        }
        if self.client_secret.trim().is_empty() {
            return Err("client_secret is required".to_string());
        }
        if self.grant_type == GrantType::AuthorizationCode && self.redirect_uri.trim().is_empty()
        {
            return Err("redirect_uri is required for the authorization_code grant".to_string());
        }
        Ok(())
    }
}

/// Error codes defined by RFC 6749 §5.2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthErrorKind {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    UnsupportedGrantType,
    InvalidScope,
    ServerError,
}

impl OAuthErrorKind {
    /// Map an `error` code; unknown codes fall back on the HTTP status.
    #[must_use]
    pub fn from_code(code: &str, status: u16) -> Self {
        match code {
            "invalid_request" => Self::InvalidRequest,
            "invalid_client" => Self::InvalidClient,
            "invalid_grant" => Self::InvalidGrant,
            "unauthorized_client" => Self::UnauthorizedClient,
            "unsupported_grant_type" => Self::UnsupportedGrantType,
            "invalid_scope" => Self::InvalidScope,
            "server_error" | "temporarily_unavailable" => Self::ServerError,
            _ => Self::from_status(status),
        }
    }

    /// Classification used when the error body cannot be parsed.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            500..=599 => Self::ServerError,
            401 => Self::InvalidClient,
            _ => Self::InvalidRequest,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for OAuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth error response from authorization server
///
/// Standard OAuth 2.0 error response format (RFC 6749 §5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}
