//! Port interfaces for the wire transport

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use upwork_common::auth::Credential;
use upwork_domain::{GraphQLResponse, Operation, UpworkError};

/// Sends GraphQL operations over the wire.
///
/// Implementations perform exactly one HTTP exchange per call and never
/// retry internally; retries belong to the execution engine.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a single operation and return its `data` member
    /// (`Value::Null` when the server omitted it).
    ///
    /// # Errors
    ///
    /// - non-2xx statuses are classified into the matching [`UpworkError`]
    ///   variant
    /// - a 2xx response with a non-empty `errors` array fails with
    ///   [`UpworkError::GraphQL`] (or `Validation` for validation codes)
    /// - the request is abandoned with [`UpworkError::Cancelled`] when
    ///   `cancel` fires
    async fn send(
        &self,
        cancel: &CancellationToken,
        operation: &Operation,
        credential: &Credential,
    ) -> Result<Value, UpworkError>;

    /// Send several operations as one JSON array and return the raw
    /// response envelopes in server order.
    ///
    /// Per-operation `errors` are left in the envelopes; only a failure of
    /// the exchange itself is an error.
    ///
    /// # Errors
    ///
    /// Same classification as [`Transport::send`]; a body that is not a JSON
    /// array is [`UpworkError::Protocol`].
    async fn send_batch(
        &self,
        cancel: &CancellationToken,
        operations: &[Operation],
        credential: &Credential,
    ) -> Result<Vec<GraphQLResponse>, UpworkError>;
}
