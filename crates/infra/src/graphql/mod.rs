//! GraphQL over HTTP

pub mod transport;

pub use transport::GraphqlTransport;
