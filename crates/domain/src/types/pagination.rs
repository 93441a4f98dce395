//! Cursor pagination types
//!
//! The API follows the Relay connection convention: list fields accept
//! `first`/`after` (or `last`/`before`) and return a `pageInfo` object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `pageInfo` block returned by connection fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_previous_page: bool,
    #[serde(default)]
    pub start_cursor: Option<String>,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// Pagination arguments for connection fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
}

impl PaginationInput {
    /// Forward pagination: `first` items after `cursor`.
    pub fn forward(first: u32, cursor: Option<&str>) -> Self {
        Self { first: Some(first), after: cursor.map(str::to_string), ..Self::default() }
    }

    /// Backward pagination: `last` items before `cursor`.
    pub fn backward(last: u32, cursor: Option<&str>) -> Self {
        Self { last: Some(last), before: cursor.map(str::to_string), ..Self::default() }
    }

    /// Render as GraphQL variables, omitting unset arguments.
    pub fn to_variables(&self) -> Map<String, Value> {
        let mut variables = Map::new();
        if let Some(first) = self.first {
            variables.insert("first".to_string(), Value::from(first));
        }
        if let Some(after) = &self.after {
            variables.insert("after".to_string(), Value::from(after.as_str()));
        }
        if let Some(last) = self.last {
            variables.insert("last".to_string(), Value::from(last));
        }
        if let Some(before) = &self.before {
            variables.insert("before".to_string(), Value::from(before.as_str()));
        }
        variables
    }
}

/// One page extracted from a response by a pagination callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub const fn new(items: Vec<T>, next_cursor: Option<String>, has_more: bool) -> Self {
        Self { items, next_cursor, has_more }
    }

    /// Final page: no cursor, nothing more to fetch.
    pub const fn last(items: Vec<T>) -> Self {
        Self { items, next_cursor: None, has_more: false }
    }

    /// Build a forward page from a connection's `pageInfo`.
    pub fn from_page_info(items: Vec<T>, page_info: &PageInfo) -> Self {
        Self {
            items,
            next_cursor: page_info.end_cursor.clone(),
            has_more: page_info.has_next_page,
        }
    }
}
