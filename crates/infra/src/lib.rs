//! # Upwork Infrastructure
//!
//! Infrastructure implementations of core ports, plus the client facade.
//!
//! This crate contains:
//! - HTTP client construction (reqwest)
//! - The GraphQL transport adapter
//! - reqwest/status → domain error conversions
//! - Configuration loading from environment and files
//! - Tracing subscriber initialisation
//! - [`UpworkClient`], which wires everything together
//!
//! ## Architecture
//! - Implements traits defined in `upwork-core`
//! - Depends on `upwork-common` and `upwork-core`
//! - Contains all "impure" code (network, environment, filesystem)

pub mod client;
pub mod config;
pub mod errors;
pub mod graphql;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use client::UpworkClient;
pub use config::SdkConfig;
pub use graphql::GraphqlTransport;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::init_tracing;
