//! Infrastructure error handling

pub mod conversions;

pub use conversions::{classify_status, parse_retry_after, InfraError};
