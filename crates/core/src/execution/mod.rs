//! Request execution: the admit → authenticate → send → retry loop

pub mod engine;
pub mod ports;
pub mod state;

pub use engine::{map_oauth_error, ExecutionEngine};
pub use ports::Transport;
pub use state::{ExecutionAttempt, ExecutionOutcome, ExecutionState};
