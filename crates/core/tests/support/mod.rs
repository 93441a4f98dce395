#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use upwork_common::auth::{Credential, TokenStore};
use upwork_common::resilience::RateLimiter;
use upwork_core::{ExecutionEngine, Transport};
use upwork_domain::{GraphQLResponse, Operation, UpworkError};

type BatchReply = Result<Vec<GraphQLResponse>, UpworkError>;

/// In-memory transport replaying scripted replies in order.
///
/// Records every call so tests can assert on what reached the wire. An
/// exhausted script fails with a protocol error so unexpected sends are
/// visible.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Value, UpworkError>>>,
    batch_replies: Mutex<VecDeque<BatchReply>>,
    latency: Mutex<Option<Duration>>,
    calls: AtomicU32,
    tokens_seen: Mutex<Vec<String>>,
    operations_seen: Mutex<Vec<Operation>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: Result<Value, UpworkError>) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    pub fn batch_reply(self, reply: BatchReply) -> Self {
        self.batch_replies.lock().push_back(reply);
        self
    }

    /// Delay every send by `latency` (observes the tokio clock)
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock() = Some(latency);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.lock().clone()
    }

    pub fn operations_seen(&self) -> Vec<Operation> {
        self.operations_seen.lock().clone()
    }

    async fn record(&self, credential: &Credential, operations: &[Operation]) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen.lock().push(credential.access_token.clone());
        self.operations_seen.lock().extend(operations.iter().cloned());

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        _cancel: &CancellationToken,
        operation: &Operation,
        credential: &Credential,
    ) -> Result<Value, UpworkError> {
        self.record(credential, std::slice::from_ref(operation)).await;
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(UpworkError::Protocol("no scripted reply".into())))
    }

    async fn send_batch(
        &self,
        _cancel: &CancellationToken,
        operations: &[Operation],
        credential: &Credential,
    ) -> Result<Vec<GraphQLResponse>, UpworkError> {
        self.record(credential, operations).await;
        self.batch_replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(UpworkError::Protocol("no scripted batch reply".into())))
    }
}

pub fn valid_credential() -> Credential {
    Credential::bearer("live-token").expiring_in(3600)
}

pub fn server_error() -> UpworkError {
    UpworkError::Server { status: 500, message: "internal error".into() }
}

pub fn engine(
    transport: &Arc<ScriptedTransport>,
    limiter: &Arc<dyn RateLimiter>,
    store: &Arc<TokenStore>,
) -> ExecutionEngine {
    ExecutionEngine::new(
        Arc::clone(transport) as Arc<dyn Transport>,
        Arc::clone(limiter),
        Arc::clone(store),
    )
}
