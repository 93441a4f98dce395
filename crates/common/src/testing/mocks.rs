//! Mock implementations of common traits
//!
//! Provides mock objects for testing purposes.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::auth::{Credential, OAuthClientError, OAuthClientTrait};
use crate::resilience::{Cancelled, RateLimiter};

type GrantResult = Result<Credential, OAuthClientError>;

/// Mock OAuth client with scripted responses
///
/// Each grant pops the next queued result; an empty queue yields a
/// configuration error so unexpected calls fail loudly.
#[derive(Debug, Default)]
pub struct MockOAuthClient {
    refresh_results: Mutex<VecDeque<GrantResult>>,
    exchange_results: Mutex<VecDeque<GrantResult>>,
    refresh_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
    last_refresh_token: Mutex<Option<String>>,
}

impl MockOAuthClient {
    /// Create a new mock OAuth client
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `refresh_token` call
    pub fn push_refresh(&self, result: GrantResult) {
        self.refresh_results.lock().push_back(result);
    }

    /// Queue the result of the next `exchange_code` call
    pub fn push_exchange(&self, result: GrantResult) {
        self.exchange_results.lock().push_back(result);
    }

    /// Number of `refresh_token` calls made so far
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Number of `exchange_code` calls made so far
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// Refresh token passed to the most recent `refresh_token` call
    pub fn last_refresh_token(&self) -> Option<String> {
        self.last_refresh_token.lock().clone()
    }

    fn next(queue: &Mutex<VecDeque<GrantResult>>, grant: &str) -> GrantResult {
        queue.lock().pop_front().unwrap_or_else(|| {
            Err(OAuthClientError::ConfigError(format!("no scripted {grant} result")))
        })
    }
}

#[async_trait]
impl OAuthClientTrait for MockOAuthClient {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://auth.example.test/authorize?state={state}")
    }

    async fn exchange_code(
        &self,
        cancel: &CancellationToken,
        _code: &str,
    ) -> Result<Credential, OAuthClientError> {
        if cancel.is_cancelled() {
            return Err(OAuthClientError::Cancelled);
        }
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.exchange_results, "exchange_code")
    }

    async fn refresh_token(
        &self,
        cancel: &CancellationToken,
        refresh_token: &str,
    ) -> Result<Credential, OAuthClientError> {
        if cancel.is_cancelled() {
            return Err(OAuthClientError::Cancelled);
        }
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_refresh_token.lock() = Some(refresh_token.to_string());
        Self::next(&self.refresh_results, "refresh_token")
    }

    async fn client_credentials(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Credential, OAuthClientError> {
        if cancel.is_cancelled() {
            return Err(OAuthClientError::Cancelled);
        }
        Self::next(&self.exchange_results, "client_credentials")
    }
}

/// Rate limiter that never blocks and counts admissions
#[derive(Debug, Default)]
pub struct CountingRateLimiter {
    waits: AtomicU64,
}

impl CountingRateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `wait` calls
    pub fn waits(&self) -> u64 {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLimiter for CountingRateLimiter {
    async fn wait(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }
        self.waits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn available(&self) -> u64 {
        u64::MAX
    }
}
