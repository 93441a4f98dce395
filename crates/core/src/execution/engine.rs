//! Execution engine - drives one logical request to completion
//!
//! Every execution walks the same explicit state machine:
//!
//! ```text
//! Admitting -> Authenticating -> Sending -> Succeeded
//!     ^                             |
//!     |                             v
//!     +-------- Retrying <---- retryable error, attempts left
//!                                   |
//!                                   v
//!                                 Failed
//! ```
//!
//! A retryable failure while refreshing the credential takes the same
//! Retrying edge as one from the send.
//!
//! Cancellation is checked at the top of every step and also interrupts the
//! rate limit wait, the send and the backoff sleep.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use upwork_common::auth::{validate_token, Credential, OAuthErrorKind, TokenStore};
use upwork_common::resilience::{sleep_or_cancel, RateLimiter, RetryConfig, RetryDecision};
use upwork_common::{OAuthClientError, OAuthClientTrait};
use upwork_domain::{decode_value, ExecutionError, GraphQLResponse, Operation, UpworkError};
use uuid::Uuid;

use super::ports::Transport;
use super::state::{ExecutionAttempt, ExecutionOutcome, ExecutionState};

/// Loop position; `Sending` carries the credential resolved for this attempt.
enum Step {
    Admitting,
    Authenticating,
    Sending(Credential),
    Retrying(Duration),
}

impl Step {
    const fn state(&self) -> ExecutionState {
        match self {
            Self::Admitting => ExecutionState::Admitting,
            Self::Authenticating => ExecutionState::Authenticating,
            Self::Sending(_) => ExecutionState::Sending,
            Self::Retrying(_) => ExecutionState::Retrying,
        }
    }
}

/// Runs operations through rate limiting, authentication, transport and
/// retry.
///
/// The engine is shared behind an `Arc`; concurrent executions share the
/// rate limit budget and the token store but nothing else.
pub struct ExecutionEngine {
    transport: Arc<dyn Transport>,
    rate_limiter: Arc<dyn RateLimiter>,
    token_store: Arc<TokenStore>,
    authenticator: Option<Arc<dyn OAuthClientTrait>>,
    retry: RetryConfig,
}

impl ExecutionEngine {
    /// Create an engine with the default retry policy and no refresh path
    pub fn new(
        transport: Arc<dyn Transport>,
        rate_limiter: Arc<dyn RateLimiter>,
        token_store: Arc<TokenStore>,
    ) -> Self {
        Self { transport, rate_limiter, token_store, authenticator: None, retry: RetryConfig::default() }
    }

    /// Refresh expired credentials through `authenticator`
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Arc<dyn OAuthClientTrait>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Store the engine reads credentials from and writes refreshes to
    pub const fn token_store(&self) -> &Arc<TokenStore> {
        &self.token_store
    }

    /// Retry policy in effect
    pub const fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Execute `operation` and decode its `data` into `T`.
    ///
    /// # Errors
    ///
    /// Returns the last error together with the number of attempts made.
    /// Decoding failures are [`UpworkError::Protocol`] and are not retried.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        operation: &Operation,
    ) -> Result<T, ExecutionError> {
        self.execute_with_outcome(cancel, operation).await.map(|outcome| outcome.data)
    }

    /// Like [`ExecutionEngine::execute`], also reporting how many attempts
    /// the result took.
    ///
    /// # Errors
    ///
    /// See [`ExecutionEngine::execute`].
    pub async fn execute_with_outcome<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        operation: &Operation,
    ) -> Result<ExecutionOutcome<T>, ExecutionError> {
        let transport = &self.transport;
        let outcome = self
            .run(cancel, operation.display_name(), move |credential| async move {
                transport.send(cancel, operation, &credential).await
            })
            .await?;

        let attempts = outcome.attempts;
        let ExecutionOutcome { data, history, .. } = outcome;
        let data = decode_value::<T>(data).map_err(|e| ExecutionError::new(attempts, e))?;
        Ok(ExecutionOutcome { data, attempts, history })
    }

    /// Send `operations` as one wire request, retried as a unit.
    ///
    /// Returns the raw envelopes; per-operation errors are left for the
    /// caller to interpret.
    ///
    /// # Errors
    ///
    /// Fails only when the exchange itself fails.
    pub async fn execute_raw_batch(
        &self,
        cancel: &CancellationToken,
        operations: &[Operation],
    ) -> Result<ExecutionOutcome<Vec<GraphQLResponse>>, ExecutionError> {
        let transport = &self.transport;
        self.run(cancel, "batch", move |credential| async move {
            transport.send_batch(cancel, operations, &credential).await
        })
        .await
    }

    async fn run<R, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: &str,
        mut dispatch: F,
    ) -> Result<ExecutionOutcome<R>, ExecutionError>
    where
        F: FnMut(Credential) -> Fut + Send,
        Fut: Future<Output = Result<R, UpworkError>> + Send,
        R: Send,
    {
        let request_id = Uuid::new_v4();
        let mut attempt: u32 = 0;
        let mut history = Vec::new();
        let mut step = Step::Admitting;

        loop {
            if cancel.is_cancelled() {
                return Err(Self::fail(
                    request_id,
                    attempt,
                    UpworkError::cancelled("execution cancelled"),
                ));
            }

            debug!(
                %request_id,
                operation,
                attempt,
                state = step.state().as_str(),
                "execution step"
            );

            step = match step {
                Step::Admitting => {
                    attempt += 1;
                    if self.rate_limiter.wait(cancel).await.is_err() {
                        return Err(Self::fail(
                            request_id,
                            attempt,
                            UpworkError::cancelled("cancelled while waiting for rate limit"),
                        ));
                    }
                    Step::Authenticating
                }
                Step::Authenticating => match self.authenticate(cancel).await {
                    Ok(credential) => Step::Sending(credential),
                    Err(error) => {
                        self.retry_or_fail(request_id, operation, attempt, error, &mut history)?
                    }
                },
                Step::Sending(credential) => {
                    let result = tokio::select! {
                        biased;
                        () = cancel.cancelled() => Err(UpworkError::cancelled("cancelled during send")),
                        result = dispatch(credential) => result,
                    };

                    match result {
                        Ok(data) => {
                            history.push(ExecutionAttempt::succeeded(attempt));
                            debug!(%request_id, operation, attempts = attempt, "execution succeeded");
                            return Ok(ExecutionOutcome { data, attempts: attempt, history });
                        }
                        Err(error) => {
                            self.retry_or_fail(request_id, operation, attempt, error, &mut history)?
                        }
                    }
                }
                Step::Retrying(delay) => {
                    if sleep_or_cancel(cancel, delay).await.is_err() {
                        return Err(Self::fail(
                            request_id,
                            attempt,
                            UpworkError::cancelled("cancelled during backoff"),
                        ));
                    }
                    Step::Admitting
                }
            };
        }
    }

    /// Resolve a usable credential, refreshing it first when it has expired.
    async fn authenticate(&self, cancel: &CancellationToken) -> Result<Credential, UpworkError> {
        let credential = self.token_store.get();
        validate_token(credential.as_ref())
            .map_err(|e| UpworkError::Authentication { status: None, message: e.to_string() })?;
        let Some(credential) = credential else {
            return Err(UpworkError::authentication("no credential available"));
        };

        if !credential.is_expired() {
            return Ok(credential);
        }

        let (Some(authenticator), Some(refresh_token)) =
            (&self.authenticator, credential.refresh_token.as_deref())
        else {
            return Err(UpworkError::authentication(
                "access token expired and no refresh path is configured",
            ));
        };

        info!("access token expired, refreshing");
        let refreshed = authenticator
            .refresh_token(cancel, refresh_token)
            .await
            .map_err(map_oauth_error)?;
        self.token_store.set(refreshed.clone());
        info!(expires_at = ?refreshed.expires_at, "access token refreshed");
        Ok(refreshed)
    }

    /// Schedule the next attempt for a retryable error, or end the execution.
    fn retry_or_fail(
        &self,
        request_id: Uuid,
        operation: &str,
        attempt: u32,
        error: UpworkError,
        history: &mut Vec<ExecutionAttempt>,
    ) -> Result<Step, ExecutionError> {
        if !error.is_retryable() || !self.retry.has_attempts_left(attempt) {
            return Err(Self::fail(request_id, attempt, error));
        }

        let decision = error.retry_after().map_or(RetryDecision::Retry, RetryDecision::RetryAfter);
        let delay = self.retry.delay_for(attempt, decision);
        warn!(
            %request_id,
            operation,
            attempt,
            error_kind = error.kind().as_str(),
            error = %error,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "retryable failure, scheduling retry"
        );
        history.push(ExecutionAttempt::retrying(attempt, error.kind()));
        Ok(Step::Retrying(delay))
    }

    fn fail(request_id: Uuid, attempts: u32, error: UpworkError) -> ExecutionError {
        debug!(
            %request_id,
            attempts,
            state = ExecutionState::Failed.as_str(),
            error_kind = error.kind().as_str(),
            error = %error,
            "execution failed"
        );
        ExecutionError::new(attempts, error)
    }
}

/// Map an OAuth grant failure onto the request error taxonomy.
///
/// Transport-level problems stay retryable; anything the token endpoint
/// rejected is an authentication failure.
pub fn map_oauth_error(error: OAuthClientError) -> UpworkError {
    match error {
        OAuthClientError::Cancelled => UpworkError::cancelled("cancelled during token refresh"),
        OAuthClientError::RequestFailed(e) => UpworkError::Network(format!("token refresh failed: {e}")),
        OAuthClientError::OAuth { kind: OAuthErrorKind::ServerError, status, message } => {
            UpworkError::Server { status, message }
        }
        OAuthClientError::OAuth { status, message, .. } => {
            UpworkError::Authentication { status: Some(status), message }
        }
        OAuthClientError::ParseError(message) => {
            UpworkError::Protocol(format!("invalid token response: {message}"))
        }
        OAuthClientError::NoRefreshToken => UpworkError::authentication("no refresh token available"),
        OAuthClientError::ConfigError(message) => UpworkError::Config(message),
    }
}
