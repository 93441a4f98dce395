//! Integration tests for the execution engine state machine.
//!
//! All time-dependent tests run on a paused tokio clock, so backoff and
//! rate limit waits complete instantly while still being measurable.

mod support;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use upwork_common::auth::{Credential, OAuthErrorKind, TokenStore};
use upwork_common::resilience::{FixedWindowLimiter, RateLimiter, RetryConfig};
use upwork_common::testing::{CountingRateLimiter, MockOAuthClient};
use upwork_common::{OAuthClientError, OAuthClientTrait};
use upwork_core::ExecutionState;
use upwork_domain::{ErrorKind, GraphQLError, GraphQLErrors, Operation, UpworkError};

use support::{engine, server_error, valid_credential, ScriptedTransport};

#[derive(Debug, Deserialize, PartialEq)]
struct Viewer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ViewerData {
    viewer: Viewer,
}

fn viewer_query() -> Operation {
    Operation::new("query { viewer { id } }").with_operation_name("Viewer")
}

fn viewer_reply(id: &str) -> Result<serde_json::Value, UpworkError> {
    Ok(json!({ "viewer": { "id": id } }))
}

/// Credential whose expiry lies a minute in the past
fn expired_credential(refresh_token: Option<&str>) -> Credential {
    let credential = Credential::bearer("old-token")
        .with_expiry(Utc::now() - chrono::Duration::seconds(60));
    match refresh_token {
        Some(token) => credential.with_refresh_token(token),
        None => credential,
    }
}

struct Harness {
    transport: Arc<ScriptedTransport>,
    limiter: Arc<CountingRateLimiter>,
    store: Arc<TokenStore>,
}

impl Harness {
    fn new(transport: ScriptedTransport, credential: Option<Credential>) -> Self {
        let store = match credential {
            Some(credential) => TokenStore::with_credential(credential),
            None => TokenStore::new(),
        };
        Self {
            transport: Arc::new(transport),
            limiter: Arc::new(CountingRateLimiter::new()),
            store: Arc::new(store),
        }
    }

    fn engine(&self) -> upwork_core::ExecutionEngine {
        let limiter: Arc<dyn RateLimiter> = self.limiter.clone();
        engine(&self.transport, &limiter, &self.store)
    }
}

#[tokio::test(start_paused = true)]
async fn test_success_on_first_attempt() -> anyhow::Result<()> {
    let harness =
        Harness::new(ScriptedTransport::new().reply(viewer_reply("u-1")), Some(valid_credential()));

    let outcome = harness
        .engine()
        .execute_with_outcome::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await?;

    assert_eq!(outcome.data.viewer, Viewer { id: "u-1".into() });
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.retries(), 0);
    assert_eq!(harness.limiter.waits(), 1);
    assert_eq!(harness.transport.tokens_seen(), vec!["live-token".to_string()]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_are_retried_with_linear_backoff() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new()
        .reply(Err(server_error()))
        .reply(Err(server_error()))
        .reply(viewer_reply("u-2"));
    let harness = Harness::new(transport, Some(valid_credential()));
    let start = Instant::now();

    let outcome = harness
        .engine()
        .execute_with_outcome::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await?;

    // 1s after the first failure, 2s after the second
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(3_100), "elapsed {elapsed:?}");

    assert_eq!(outcome.data.viewer.id, "u-2");
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.retries(), 2);
    let states: Vec<ExecutionState> = outcome.history.iter().map(|a| a.state).collect();
    assert_eq!(
        states,
        vec![ExecutionState::Retrying, ExecutionState::Retrying, ExecutionState::Succeeded]
    );
    assert_eq!(outcome.history[0].error_kind, Some(ErrorKind::Server));
    assert_eq!(outcome.history[2].error_kind, None);
    // every attempt is admitted by the limiter
    assert_eq!(harness.limiter.waits(), 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_exhausted_reports_attempts() {
    let transport = ScriptedTransport::new()
        .reply(Err(UpworkError::Network("connection reset".into())))
        .reply(Err(UpworkError::Network("connection reset".into())))
        .reply(Err(UpworkError::Network("connection reset".into())))
        .reply(viewer_reply("never"));
    let harness = Harness::new(transport, Some(valid_credential()));

    let err = harness
        .engine()
        .execute::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.attempts, 3);
    assert_eq!(harness.transport.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_error_fails_immediately() {
    let transport = ScriptedTransport::new()
        .reply(Err(UpworkError::Validation {
            field: Some("contractId".into()),
            message: "must not be empty".into(),
        }))
        .reply(viewer_reply("never"));
    let harness = Harness::new(transport, Some(valid_credential()));
    let start = Instant::now();

    let err = harness
        .engine()
        .execute::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.attempts, 1);
    assert_eq!(harness.transport.calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_response_is_not_retried() {
    let transport = ScriptedTransport::new()
        .reply(Err(UpworkError::Authentication {
            status: Some(401),
            message: "token revoked".into(),
        }))
        .reply(viewer_reply("never"));
    let harness = Harness::new(transport, Some(valid_credential()));

    let err = harness
        .engine()
        .execute::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.attempts, 1);
    assert_eq!(harness.transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_single_server_error_then_success() {
    let transport = ScriptedTransport::new().reply(Err(server_error())).reply(viewer_reply("u-5"));
    let harness = Harness::new(transport, Some(valid_credential()));

    let outcome = harness
        .engine()
        .execute_with_outcome::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await
        .unwrap();

    assert_eq!(outcome.data.viewer.id, "u-5");
    assert_eq!(outcome.attempts, 2);
    assert_eq!(harness.transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_graphql_errors_are_terminal() {
    let errors = GraphQLErrors::from(vec![GraphQLError::new("Contract not found")]);
    let transport = ScriptedTransport::new()
        .reply(Err(UpworkError::from(errors)))
        .reply(viewer_reply("never"));
    let harness = Harness::new(transport, Some(valid_credential()));

    let err = harness
        .engine()
        .execute::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::GraphQL);
    assert!(err.to_string().contains("Contract not found"));
    assert_eq!(err.attempts, 1);
    assert_eq!(harness.transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_extends_backoff() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new()
        .reply(Err(UpworkError::RateLimited {
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(5)),
        }))
        .reply(viewer_reply("u-3"));
    let harness = Harness::new(transport, Some(valid_credential()));
    let start = Instant::now();

    let outcome = harness
        .engine()
        .execute_with_outcome::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await?;

    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.history[0].error_kind, Some(ErrorKind::RateLimit));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_custom_retry_config_is_honoured() {
    let transport = ScriptedTransport::new()
        .reply(Err(server_error()))
        .reply(Err(server_error()))
        .reply(viewer_reply("never"));
    let harness = Harness::new(transport, Some(valid_credential()));
    let retry = RetryConfig::builder()
        .max_attempts(2)
        .fixed_backoff(Duration::from_millis(250))
        .build()
        .unwrap();
    let start = Instant::now();

    let err = harness
        .engine()
        .with_retry_config(retry)
        .execute::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await
        .unwrap_err();

    assert_eq!(err.attempts, 2);
    assert_eq!(err.kind(), ErrorKind::Server);
    assert!(start.elapsed() >= Duration::from_millis(250));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_missing_credential_never_reaches_transport() {
    let harness = Harness::new(ScriptedTransport::new().reply(viewer_reply("never")), None);

    let err = harness
        .engine()
        .execute::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.attempts, 1);
    assert_eq!(harness.transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_expired_credential_without_refresh_token_fails() {
    let expired = expired_credential(None);
    let harness = Harness::new(ScriptedTransport::new().reply(viewer_reply("never")), Some(expired));

    let err = harness
        .engine()
        .execute::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(harness.transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_expired_credential_without_authenticator_fails() {
    let expired = expired_credential(Some("rt-1"));
    let harness = Harness::new(ScriptedTransport::new().reply(viewer_reply("never")), Some(expired));

    let err = harness
        .engine()
        .execute::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(harness.transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_expired_credential_is_refreshed_and_stored() -> anyhow::Result<()> {
    let expired = expired_credential(Some("rt-1"));
    let harness = Harness::new(ScriptedTransport::new().reply(viewer_reply("u-4")), Some(expired));
    let oauth = Arc::new(MockOAuthClient::new());
    oauth.push_refresh(Ok(Credential::bearer("fresh-token")
        .with_refresh_token("rt-2")
        .expiring_in(3600)));

    let viewer: ViewerData = harness
        .engine()
        .with_authenticator(oauth.clone() as Arc<dyn OAuthClientTrait>)
        .execute(&CancellationToken::new(), &viewer_query())
        .await?;

    assert_eq!(viewer.viewer.id, "u-4");
    assert_eq!(oauth.refresh_calls(), 1);
    assert_eq!(oauth.last_refresh_token().as_deref(), Some("rt-1"));
    assert_eq!(harness.transport.tokens_seen(), vec!["fresh-token".to_string()]);

    let stored = harness.store.get().unwrap();
    assert_eq!(stored.access_token, "fresh-token");
    assert_eq!(stored.refresh_token.as_deref(), Some("rt-2"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rejected_refresh_is_an_authentication_failure() {
    let expired = expired_credential(Some("revoked"));
    let harness = Harness::new(ScriptedTransport::new().reply(viewer_reply("never")), Some(expired));
    let oauth = Arc::new(MockOAuthClient::new());
    oauth.push_refresh(Err(OAuthClientError::OAuth {
        kind: OAuthErrorKind::InvalidGrant,
        status: 400,
        message: "refresh token revoked".into(),
    }));

    let err = harness
        .engine()
        .with_authenticator(oauth.clone() as Arc<dyn OAuthClientTrait>)
        .execute::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.attempts, 1);
    assert_eq!(harness.transport.calls(), 0);
    assert_eq!(harness.store.get().unwrap().access_token, "old-token");
}

#[tokio::test(start_paused = true)]
async fn test_transient_refresh_failure_is_retried() -> anyhow::Result<()> {
    let harness = Harness::new(
        ScriptedTransport::new().reply(viewer_reply("u-5")),
        Some(expired_credential(Some("rt-1"))),
    );
    let oauth = Arc::new(MockOAuthClient::new());
    oauth.push_refresh(Err(OAuthClientError::OAuth {
        kind: OAuthErrorKind::ServerError,
        status: 503,
        message: "token service unavailable".into(),
    }));
    oauth.push_refresh(Ok(Credential::bearer("fresh-token").expiring_in(3600)));

    let outcome = harness
        .engine()
        .with_authenticator(oauth.clone() as Arc<dyn OAuthClientTrait>)
        .execute_with_outcome::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await?;

    assert_eq!(outcome.data.viewer.id, "u-5");
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.history[0].state, ExecutionState::Retrying);
    assert_eq!(outcome.history[0].error_kind, Some(ErrorKind::Server));
    assert_eq!(oauth.refresh_calls(), 2);
    assert_eq!(harness.limiter.waits(), 2);
    assert_eq!(harness.transport.tokens_seen(), vec!["fresh-token".to_string()]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_refresh_server_errors_exhaust_retry_budget() {
    let harness = Harness::new(
        ScriptedTransport::new().reply(viewer_reply("never")),
        Some(expired_credential(Some("rt-1"))),
    );
    let oauth = Arc::new(MockOAuthClient::new());
    for _ in 0..3 {
        oauth.push_refresh(Err(OAuthClientError::OAuth {
            kind: OAuthErrorKind::ServerError,
            status: 502,
            message: "bad gateway".into(),
        }));
    }

    let err = harness
        .engine()
        .with_authenticator(oauth.clone() as Arc<dyn OAuthClientTrait>)
        .execute::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(err.attempts, 3);
    assert_eq!(oauth.refresh_calls(), 3);
    assert_eq!(harness.transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start_does_nothing() {
    let harness =
        Harness::new(ScriptedTransport::new().reply(viewer_reply("never")), Some(valid_credential()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = harness.engine().execute::<ViewerData>(&cancel, &viewer_query()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.attempts, 0);
    assert_eq!(harness.limiter.waits(), 0);
    assert_eq!(harness.transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_backoff() {
    let transport = ScriptedTransport::new().reply(Err(server_error())).reply(viewer_reply("never"));
    let harness = Harness::new(transport, Some(valid_credential()));
    let cancel = CancellationToken::new();
    let start = Instant::now();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let err = harness.engine().execute::<ViewerData>(&cancel, &viewer_query()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.attempts, 1);
    assert_eq!(harness.transport.calls(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_in_flight_send() {
    let transport = ScriptedTransport::new()
        .reply(viewer_reply("too-late"))
        .with_latency(Duration::from_secs(10));
    let harness = Harness::new(transport, Some(valid_credential()));
    let cancel = CancellationToken::new();
    let start = Instant::now();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let err = harness.engine().execute::<ViewerData>(&cancel, &viewer_query()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.attempts, 1);
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_data_is_a_protocol_error() {
    let transport = ScriptedTransport::new().reply(Ok(json!({ "viewer": { "name": "no id" } })));
    let harness = Harness::new(transport, Some(valid_credential()));

    let err = harness
        .engine()
        .execute::<ViewerData>(&CancellationToken::new(), &viewer_query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.attempts, 1);
    assert_eq!(harness.transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_executions_share_the_rate_limit_window() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(viewer_reply("a"))
            .reply(viewer_reply("b"))
            .reply(viewer_reply("c")),
    );
    let limiter: Arc<dyn RateLimiter> =
        Arc::new(FixedWindowLimiter::new(2, Duration::from_secs(60)).unwrap());
    let store = Arc::new(TokenStore::with_credential(valid_credential()));
    let engine = engine(&transport, &limiter, &store);
    let cancel = CancellationToken::new();
    let start = Instant::now();

    for _ in 0..2 {
        engine.execute::<ViewerData>(&cancel, &viewer_query()).await.unwrap();
    }
    assert!(start.elapsed() < Duration::from_secs(1));

    engine.execute::<ViewerData>(&cancel, &viewer_query()).await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(60));
    assert_eq!(transport.calls(), 3);
}
