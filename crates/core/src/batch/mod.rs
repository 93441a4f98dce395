//! Batch and pagination orchestration
//!
//! This module layers multi-operation workflows on top of the execution
//! engine: several operations in one wire request, and cursor-driven
//! pagination until the server reports no further pages.

pub mod orchestrator;

pub use orchestrator::{BatchOrchestrator, BatchOutcome};
