//! Observability infrastructure
//!
//! The SDK only emits `tracing` events; installing a subscriber is left to
//! the application. [`init_tracing`] is a convenience for binaries and
//! examples that have no subscriber of their own.

pub mod logging;

pub use logging::{init_tracing, ObservabilityError};
