//! reqwest-backed implementation of the core `Transport` port

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use upwork_common::auth::Credential;
use upwork_core::Transport;
use upwork_domain::constants::TENANT_HEADER;
use upwork_domain::{ClientConfig, GraphQLResponse, Operation, UpworkError};

use crate::errors::{classify_status, parse_retry_after, InfraError};
use crate::http::HttpClient;

const JSON: &str = "application/json";

/// Posts GraphQL operations to the API endpoint.
///
/// One HTTP exchange per call, no retries. The organization id, when set, is
/// sent as the tenant header on every request.
#[derive(Debug, Clone)]
pub struct GraphqlTransport {
    http: HttpClient,
    api_url: String,
    organization_id: Option<String>,
}

impl GraphqlTransport {
    pub fn new(http: HttpClient, config: &ClientConfig) -> Self {
        Self {
            http,
            api_url: config.api_url.clone(),
            organization_id: config.organization_id.clone(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    fn request(&self, credential: &Credential) -> RequestBuilder {
        let builder = self
            .http
            .request(Method::POST, &self.api_url)
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON)
            .header(AUTHORIZATION, credential.authorization_header());

        match &self.organization_id {
            Some(organization_id) => builder.header(TENANT_HEADER, organization_id),
            None => builder,
        }
    }

    /// POST `body` and return the raw response text of a 2xx response.
    async fn exchange<B>(
        &self,
        cancel: &CancellationToken,
        credential: &Credential,
        body: &B,
    ) -> Result<String, UpworkError>
    where
        B: Serialize + ?Sized + Sync,
    {
        if cancel.is_cancelled() {
            return Err(UpworkError::cancelled("request cancelled before send"));
        }

        let builder = self.request(credential).json(body);
        let exchange = async {
            let response = self.http.send(builder).await?;
            let status = response.status();
            let retry_after = parse_retry_after(response.headers());
            let text = response.text().await.map_err(|e| UpworkError::from(InfraError::from(e)))?;

            if !status.is_success() {
                let error = classify_status(status, retry_after, &text);
                warn!(
                    status = status.as_u16(),
                    error_kind = error.kind().as_str(),
                    "GraphQL endpoint returned an error status"
                );
                return Err(error);
            }

            debug!(status = status.as_u16(), bytes = text.len(), "received GraphQL response");
            Ok(text)
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(UpworkError::cancelled("request cancelled in flight")),
            result = exchange => result,
        }
    }
}

#[async_trait]
impl Transport for GraphqlTransport {
    async fn send(
        &self,
        cancel: &CancellationToken,
        operation: &Operation,
        credential: &Credential,
    ) -> Result<Value, UpworkError> {
        debug!(operation = operation.display_name(), "sending GraphQL operation");
        let text = self.exchange(cancel, credential, operation).await?;

        let envelope: GraphQLResponse = serde_json::from_str(&text)
            .map_err(|e| UpworkError::Protocol(format!("invalid GraphQL response: {e}")))?;
        Ok(envelope.into_result()?.unwrap_or(Value::Null))
    }

    async fn send_batch(
        &self,
        cancel: &CancellationToken,
        operations: &[Operation],
        credential: &Credential,
    ) -> Result<Vec<GraphQLResponse>, UpworkError> {
        debug!(operations = operations.len(), "sending GraphQL batch");
        let text = self.exchange(cancel, credential, operations).await?;

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| UpworkError::Protocol(format!("invalid batch response: {e}")))?;
        if !body.is_array() {
            return Err(UpworkError::Protocol("batch response is not a JSON array".into()));
        }
        serde_json::from_value(body)
            .map_err(|e| UpworkError::Protocol(format!("invalid batch response entry: {e}")))
    }
}
