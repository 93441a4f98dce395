//! # Upwork Core
//!
//! Request pipeline logic - no HTTP or platform dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the wire transport
//! - The execution engine: admission, authentication, dispatch and retry
//! - Batch and pagination orchestration on top of the engine
//!
//! ## Architecture Principles
//! - Only depends on `upwork-common` and `upwork-domain`
//! - No reqwest, no sockets, no environment access
//! - All external effects via traits (`Transport`, `RateLimiter`,
//!   `OAuthClientTrait`)
//! - Deterministically testable with scripted fakes and a paused clock

pub mod batch;
pub mod execution;

pub use batch::{BatchOrchestrator, BatchOutcome};
pub use execution::ports::Transport;
pub use execution::{
    map_oauth_error, ExecutionAttempt, ExecutionEngine, ExecutionOutcome, ExecutionState,
};
