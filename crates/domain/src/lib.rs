//! # Upwork Domain
//!
//! Domain types shared by every layer of the Upwork client.
//!
//! This crate contains:
//! - The error taxonomy (`UpworkError`, `ErrorKind`, `ExecutionError`)
//! - Client configuration (`ClientConfig`)
//! - GraphQL wire types (`Operation`, `GraphQLResponse`, `GraphQLError`)
//! - Cursor pagination types (`PageInfo`, `PaginationInput`, `Page`)
//!
//! ## Architecture
//! - No dependencies on other Upwork crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
