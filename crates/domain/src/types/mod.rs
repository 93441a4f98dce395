//! Domain types and models

pub mod graphql;
pub mod pagination;

pub use graphql::{
    decode_value, ErrorLocation, GraphQLError, GraphQLErrors, GraphQLResponse, Operation,
    PathSegment,
};
pub use pagination::{Page, PageInfo, PaginationInput};
