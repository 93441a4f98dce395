//! Shared fixtures for the infra integration tests.
//!
//! Every client built here points both the GraphQL endpoint and the OAuth
//! token endpoint at a WireMock server, and uses a short backoff so retry
//! tests finish quickly on the real clock.

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use upwork_common::auth::{Credential, OAuthConfig};
use upwork_domain::{ClientConfig, RetrySettings};
use upwork_infra::{SdkConfig, UpworkClient};
use wiremock::MockServer;

pub const GRAPHQL_PATH: &str = "/graphql";
pub const TOKEN_PATH: &str = "/oauth/token";

/// Backoff base used by test clients
pub const TEST_BASE_DELAY_MS: u64 = 20;

pub fn sdk_config(server: &MockServer) -> SdkConfig {
    let client = ClientConfig {
        api_url: format!("{}{GRAPHQL_PATH}", server.uri()),
        timeout_secs: 5,
        retry: RetrySettings { max_attempts: 3, base_delay_ms: TEST_BASE_DELAY_MS },
        ..ClientConfig::default()
    };
    let oauth = OAuthConfig::new("test-client", "test-secret", "https://app.example.com/callback")
        .with_endpoints(
            format!("{}/oauth/authorize", server.uri()),
            format!("{}{TOKEN_PATH}", server.uri()),
        );
    SdkConfig::new(client, oauth)
}

/// Client with a valid bearer credential already stored.
pub fn authenticated_client(server: &MockServer) -> UpworkClient {
    let client = UpworkClient::new(sdk_config(server)).expect("client should build");
    client.set_credential(Credential::bearer("live-token").expiring_in(3600));
    client
}

/// Credential that expired an hour ago but can still be refreshed.
pub fn expired_credential(refresh_token: &str) -> Credential {
    Credential::bearer("stale-token")
        .with_refresh_token(refresh_token)
        .with_expiry(Utc::now() - ChronoDuration::hours(1))
}

pub fn data(body: Value) -> Value {
    json!({ "data": body })
}

pub fn token_body(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 86_400
    })
}
