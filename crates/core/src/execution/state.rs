//! Execution lifecycle records

use std::fmt;

use upwork_domain::ErrorKind;

/// Lifecycle states of a single execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionState {
    /// Waiting for a rate limit token
    Admitting,
    /// Resolving (and possibly refreshing) the credential
    Authenticating,
    /// Request on the wire
    Sending,
    /// Sleeping before the next attempt
    Retrying,
    /// Data returned to the caller
    Succeeded,
    /// Error returned to the caller
    Failed,
}

impl ExecutionState {
    /// Lowercase name used in log fields
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admitting => "admitting",
            Self::Authenticating => "authenticating",
            Self::Sending => "sending",
            Self::Retrying => "retrying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// `Succeeded` and `Failed` end the execution
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one iteration of the execution loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionAttempt {
    /// 1-based attempt number
    pub attempt: u32,
    /// `Retrying` for every attempt but the last, `Succeeded` for the last.
    /// A failed execution returns an [`ExecutionError`] instead, so no
    /// history records `Failed`.
    ///
    /// [`ExecutionError`]: upwork_domain::ExecutionError
    pub state: ExecutionState,
    /// Kind of the error that ended the attempt, if any
    pub error_kind: Option<ErrorKind>,
}

impl ExecutionAttempt {
    pub(crate) const fn succeeded(attempt: u32) -> Self {
        Self { attempt, state: ExecutionState::Succeeded, error_kind: None }
    }

    pub(crate) const fn retrying(attempt: u32, kind: ErrorKind) -> Self {
        Self { attempt, state: ExecutionState::Retrying, error_kind: Some(kind) }
    }
}

/// Successful result together with how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome<T> {
    /// Decoded payload
    pub data: T,
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// One record per attempt, in order
    pub history: Vec<ExecutionAttempt>,
}

impl<T> ExecutionOutcome<T> {
    /// Replace the payload, keeping the attempt bookkeeping
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExecutionOutcome<U> {
        ExecutionOutcome { data: f(self.data), attempts: self.attempts, history: self.history }
    }

    /// Number of attempts that ended in a retry
    pub fn retries(&self) -> usize {
        self.history.iter().filter(|a| a.state == ExecutionState::Retrying).count()
    }
}
