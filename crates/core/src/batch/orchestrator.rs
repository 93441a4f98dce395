//! Batch orchestrator - batched and paginated execution

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use upwork_domain::{
    decode_value, ExecutionError, GraphQLErrors, GraphQLResponse, Operation, Page, UpworkError,
};

use crate::execution::ExecutionEngine;

/// Result of one operation inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// The operation's `data` member (`Value::Null` if absent)
    Success(Value),
    /// The operation's envelope carried errors
    Failure(UpworkError),
}

impl BatchOutcome {
    /// Whether the operation produced data
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The slot's error, if it failed
    pub const fn error(&self) -> Option<&UpworkError> {
        match self {
            Self::Failure(error) => Some(error),
            Self::Success(_) => None,
        }
    }

    /// # Errors
    ///
    /// Returns the slot's error for a failed operation.
    pub fn into_result(self) -> Result<Value, UpworkError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(error) => Err(error),
        }
    }

    /// Decode a successful slot into `T`.
    ///
    /// # Errors
    ///
    /// Returns the slot's error, or [`UpworkError::Protocol`] if the data
    /// does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, UpworkError> {
        self.into_result().and_then(decode_value)
    }
}

impl From<GraphQLResponse> for BatchOutcome {
    fn from(envelope: GraphQLResponse) -> Self {
        if envelope.has_errors() {
            Self::Failure(UpworkError::from(GraphQLErrors::from(envelope.errors)))
        } else {
            Self::Success(envelope.data.unwrap_or(Value::Null))
        }
    }
}

/// Runs batches and paginated queries through a shared [`ExecutionEngine`]
#[derive(Clone)]
pub struct BatchOrchestrator {
    engine: Arc<ExecutionEngine>,
}

impl BatchOrchestrator {
    /// Wrap an engine shared with single-operation callers
    pub const fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self { engine }
    }

    /// Engine every batch and page goes through
    pub const fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// Send `operations` in one wire request.
    ///
    /// The request is rate limited and retried as a unit. The result is
    /// index-aligned with `operations`; an operation whose envelope carries
    /// errors becomes a [`BatchOutcome::Failure`] without failing its
    /// siblings. An empty input returns immediately without any I/O.
    ///
    /// # Errors
    ///
    /// Fails when the exchange fails, or with [`UpworkError::Protocol`] when
    /// the server returns a different number of envelopes than operations
    /// sent.
    pub async fn execute_batch(
        &self,
        cancel: &CancellationToken,
        operations: &[Operation],
    ) -> Result<Vec<BatchOutcome>, ExecutionError> {
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        let outcome = self.engine.execute_raw_batch(cancel, operations).await?;
        if outcome.data.len() != operations.len() {
            return Err(ExecutionError::new(
                outcome.attempts,
                UpworkError::Protocol(format!(
                    "batch response has {} results for {} operations",
                    outcome.data.len(),
                    operations.len()
                )),
            ));
        }

        let results: Vec<BatchOutcome> = outcome.data.into_iter().map(BatchOutcome::from).collect();
        debug!(
            operations = operations.len(),
            failed = results.iter().filter(|r| !r.is_success()).count(),
            attempts = outcome.attempts,
            "batch completed"
        );
        Ok(results)
    }

    /// Fetch every page of a cursor-paginated query.
    ///
    /// `make_operation` builds the request for a cursor (`None` for the
    /// first page); `extract_page` pulls the items and the next cursor out
    /// of the decoded response. Each page goes through the engine, so it is
    /// rate limited, retried and cancellable like any other request.
    ///
    /// # Errors
    ///
    /// Stops at the first failing page. A page that reports more data but
    /// gives no new cursor is [`UpworkError::Protocol`].
    pub async fn paginate<T, R, M, X>(
        &self,
        cancel: &CancellationToken,
        mut make_operation: M,
        mut extract_page: X,
    ) -> Result<Vec<T>, ExecutionError>
    where
        R: DeserializeOwned,
        M: FnMut(Option<&str>) -> Operation,
        X: FnMut(R) -> Result<Page<T>, UpworkError>,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages: u32 = 0;

        loop {
            let operation = make_operation(cursor.as_deref());
            let outcome = self.engine.execute_with_outcome::<R>(cancel, &operation).await?;
            let attempts = outcome.attempts;
            let page = extract_page(outcome.data).map_err(|e| ExecutionError::new(attempts, e))?;
            pages += 1;
            items.extend(page.items);

            if !page.has_more {
                debug!(pages, items = items.len(), "pagination complete");
                return Ok(items);
            }

            match page.next_cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                Some(next) => {
                    return Err(ExecutionError::new(
                        attempts,
                        UpworkError::Protocol(format!(
                            "pagination cursor '{next}' did not advance after page {pages}"
                        )),
                    ));
                }
                None => {
                    return Err(ExecutionError::new(
                        attempts,
                        UpworkError::Protocol(format!(
                            "page {pages} reports more results but no cursor"
                        )),
                    ));
                }
            }
        }
    }
}
