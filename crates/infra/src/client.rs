//! Client facade
//!
//! [`UpworkClient`] wires the HTTP pool, token store, rate limiter, OAuth
//! client, GraphQL transport and execution engine together. Clones and
//! organization-scoped copies share the token store, the rate limit budget
//! and the connection pool.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::info;
use upwork_common::auth::{Credential, OAuthClient, TokenStore};
use upwork_common::resilience::{BackoffStrategy, FixedWindowLimiter, RateLimiter, RetryConfig};
use upwork_common::OAuthClientTrait;
use upwork_core::{
    map_oauth_error, BatchOrchestrator, BatchOutcome, ExecutionEngine, ExecutionOutcome, Transport,
};
use upwork_domain::{ClientConfig, ExecutionError, Operation, Page, UpworkError};

use crate::config::SdkConfig;
use crate::graphql::GraphqlTransport;
use crate::http::HttpClient;

/// Entry point for talking to the Upwork GraphQL API
///
/// # Examples
///
/// ```rust,no_run
/// use serde_json::Value;
/// use tokio_util::sync::CancellationToken;
/// use upwork_common::auth::Credential;
/// use upwork_domain::Operation;
/// use upwork_infra::{config, UpworkClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = UpworkClient::new(config::load()?)?;
/// client.set_credential(Credential::bearer("access-token"));
///
/// let viewer: Value = client
///     .execute(&CancellationToken::new(), &Operation::new("query { user { id } }"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct UpworkClient {
    config: Arc<ClientConfig>,
    http: HttpClient,
    oauth: Arc<OAuthClient>,
    token_store: Arc<TokenStore>,
    rate_limiter: Arc<dyn RateLimiter>,
    engine: Arc<ExecutionEngine>,
    batches: BatchOrchestrator,
}

impl UpworkClient {
    /// Build a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`UpworkError::Config`] if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: SdkConfig) -> Result<Self, UpworkError> {
        config.validate()?;
        let SdkConfig { client, oauth } = config;

        let http = HttpClient::from_config(&client)?;
        let oauth = Arc::new(OAuthClient::with_http_client(oauth, http.inner().clone()));
        let rate_limiter =
            FixedWindowLimiter::new(client.rate_limit.max_requests, client.rate_limit.window())
                .map_err(UpworkError::Config)?;

        Ok(Self::assemble(
            client,
            http,
            oauth,
            Arc::new(TokenStore::new()),
            Arc::new(rate_limiter),
        ))
    }

    fn assemble(
        config: ClientConfig,
        http: HttpClient,
        oauth: Arc<OAuthClient>,
        token_store: Arc<TokenStore>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let retry = RetryConfig {
            max_attempts: config.retry.max_attempts,
            backoff: BackoffStrategy::linear(config.retry.base_delay()),
        };
        let transport: Arc<dyn Transport> = Arc::new(GraphqlTransport::new(http.clone(), &config));
        let engine = Arc::new(
            ExecutionEngine::new(transport, Arc::clone(&rate_limiter), Arc::clone(&token_store))
                .with_authenticator(Arc::clone(&oauth) as Arc<dyn OAuthClientTrait>)
                .with_retry_config(retry),
        );

        Self {
            config: Arc::new(config),
            http,
            oauth,
            token_store,
            rate_limiter,
            batches: BatchOrchestrator::new(Arc::clone(&engine)),
            engine,
        }
    }

    /// A copy of this client acting on behalf of `organization_id`.
    ///
    /// The original is unchanged. Both share the token store, the rate limit
    /// budget and the HTTP connection pool. An empty id clears the tenant.
    #[must_use]
    pub fn with_organization_id(&self, organization_id: impl Into<String>) -> Self {
        Self::assemble(
            self.config.with_organization_id(organization_id),
            self.http.clone(),
            Arc::clone(&self.oauth),
            Arc::clone(&self.token_store),
            Arc::clone(&self.rate_limiter),
        )
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.config.organization_id.as_deref()
    }

    /* ---------------------------------------------------------------------- */
    /* Authentication */
    /* ---------------------------------------------------------------------- */

    /// Browser URL that starts the authorization flow
    pub fn authorization_url(&self, state: &str) -> String {
        self.oauth.authorization_url(state)
    }

    /// Exchange an authorization code and store the resulting credential.
    ///
    /// # Errors
    ///
    /// Returns the classified token endpoint failure; the stored credential
    /// is left untouched on error.
    pub async fn exchange_code(
        &self,
        cancel: &CancellationToken,
        code: &str,
    ) -> Result<Credential, UpworkError> {
        let credential = self.oauth.exchange_code(cancel, code).await.map_err(map_oauth_error)?;
        self.token_store.set(credential.clone());
        info!(expires_at = ?credential.expires_at, "authorization code exchanged");
        Ok(credential)
    }

    /// Refresh the stored credential now, regardless of its expiry.
    ///
    /// # Errors
    ///
    /// Returns [`UpworkError::Authentication`] if no refresh token is stored,
    /// otherwise the classified token endpoint failure.
    pub async fn refresh_token(&self, cancel: &CancellationToken) -> Result<Credential, UpworkError> {
        let refresh_token = self
            .token_store
            .get()
            .and_then(|credential| credential.refresh_token)
            .ok_or_else(|| UpworkError::authentication("no refresh token available"))?;

        let credential =
            self.oauth.refresh_token(cancel, &refresh_token).await.map_err(map_oauth_error)?;
        self.token_store.set(credential.clone());
        info!(expires_at = ?credential.expires_at, "access token refreshed");
        Ok(credential)
    }

    /// Obtain an application credential via the client credentials grant and
    /// store it.
    ///
    /// # Errors
    ///
    /// Returns [`UpworkError::Config`] unless the client is configured for
    /// the client credentials grant, otherwise the classified token endpoint
    /// failure.
    pub async fn client_credentials(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Credential, UpworkError> {
        let credential = self.oauth.client_credentials(cancel).await.map_err(map_oauth_error)?;
        self.token_store.set(credential.clone());
        info!(expires_at = ?credential.expires_at, "client credentials granted");
        Ok(credential)
    }

    /// Use an externally obtained credential (e.g. restored from storage)
    pub fn set_credential(&self, credential: Credential) {
        self.token_store.set(credential);
    }

    pub fn credential(&self) -> Option<Credential> {
        self.token_store.get()
    }

    /// Forget the stored credential (logout)
    pub fn clear_credential(&self) {
        self.token_store.clear();
    }

    /// `true` when no credential is stored or the stored one has expired
    pub fn is_token_expired(&self) -> bool {
        self.token_store.is_expired()
    }

    pub const fn token_store(&self) -> &Arc<TokenStore> {
        &self.token_store
    }

    /* ---------------------------------------------------------------------- */
    /* Execution */
    /* ---------------------------------------------------------------------- */

    /// Execute one operation and decode its `data` into `T`.
    ///
    /// # Errors
    ///
    /// Returns the final error and the number of attempts made.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        operation: &Operation,
    ) -> Result<T, ExecutionError> {
        self.engine.execute(cancel, operation).await
    }

    /// Like [`UpworkClient::execute`], also reporting the attempt history.
    ///
    /// # Errors
    ///
    /// See [`UpworkClient::execute`].
    pub async fn execute_with_outcome<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        operation: &Operation,
    ) -> Result<ExecutionOutcome<T>, ExecutionError> {
        self.engine.execute_with_outcome(cancel, operation).await
    }

    /// Send several operations in one request; see
    /// [`BatchOrchestrator::execute_batch`].
    ///
    /// # Errors
    ///
    /// Fails only when the exchange as a whole fails.
    pub async fn execute_batch(
        &self,
        cancel: &CancellationToken,
        operations: &[Operation],
    ) -> Result<Vec<BatchOutcome>, ExecutionError> {
        self.batches.execute_batch(cancel, operations).await
    }

    /// Fetch every page of a cursor-paginated query; see
    /// [`BatchOrchestrator::paginate`].
    ///
    /// # Errors
    ///
    /// Stops at the first failing page.
    pub async fn paginate<T, R, M, X>(
        &self,
        cancel: &CancellationToken,
        make_operation: M,
        extract_page: X,
    ) -> Result<Vec<T>, ExecutionError>
    where
        R: DeserializeOwned,
        M: FnMut(Option<&str>) -> Operation,
        X: FnMut(R) -> Result<Page<T>, UpworkError>,
    {
        self.batches.paginate(cancel, make_operation, extract_page).await
    }

    /// Rate limit tokens left in the current window (a snapshot)
    pub fn rate_limit_available(&self) -> u64 {
        self.rate_limiter.available()
    }
}
