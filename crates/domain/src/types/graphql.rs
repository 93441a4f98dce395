//! GraphQL wire types
//!
//! [`Operation`] is the request body sent to the API; [`GraphQLResponse`] is
//! the `{data, errors}` envelope every response (and every batch slot) uses.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::constants::VALIDATION_ERROR_CODES;
use crate::errors::UpworkError;

/// A GraphQL request: document, variables and optional operation name.
///
/// Operations are immutable values; the builder methods consume `self` and
/// return a new operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub query: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
    #[serde(rename = "operationName", default)]
    pub operation_name: Option<String>,
}

impl Operation {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), variables: Map::new(), operation_name: None }
    }

    /// Build an operation whose variables come from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `variables` does not serialize to a JSON
    /// object.
    pub fn with_typed_variables<V: Serialize>(
        query: impl Into<String>,
        variables: &V,
    ) -> Result<Self, UpworkError> {
        match serde_json::to_value(variables) {
            Ok(Value::Object(map)) => Ok(Self::new(query).with_variables(map)),
            Ok(Value::Null) => Ok(Self::new(query)),
            Ok(other) => Err(UpworkError::Validation {
                field: Some("variables".to_string()),
                message: format!("variables must serialize to a JSON object, got {other}"),
            }),
            Err(e) => Err(UpworkError::Validation {
                field: Some("variables".to_string()),
                message: e.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Name used in logs: the operation name, or `"anonymous"`.
    pub fn display_name(&self) -> &str {
        self.operation_name.as_deref().unwrap_or("anonymous")
    }
}

/// Response envelope shared by single and batched requests.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphQLResponse<T = Value> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<GraphQLError>,
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl<T> GraphQLResponse<T> {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Split the envelope into its data or its error list.
    ///
    /// # Errors
    ///
    /// Returns the classified error list when `errors` is non-empty, even if
    /// partial `data` was also returned.
    pub fn into_result(self) -> Result<Option<T>, UpworkError> {
        if self.errors.is_empty() {
            Ok(self.data)
        } else {
            Err(UpworkError::from(GraphQLErrors::from(self.errors)))
        }
    }
}

impl GraphQLResponse<Value> {
    /// Decode the `data` member into a typed value.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the data does not match `T`.
    pub fn decode_data<T: DeserializeOwned>(self) -> Result<T, UpworkError> {
        decode_value(self.data.unwrap_or(Value::Null))
    }
}

/// Decode a JSON value, classifying mismatches as protocol errors.
///
/// # Errors
///
/// Returns a protocol error if `value` does not deserialize into `T`.
pub fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T, UpworkError> {
    serde_json::from_value(value)
        .map_err(|e| UpworkError::Protocol(format!("failed to decode response data: {e}")))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single entry of the `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), locations: Vec::new(), path: Vec::new(), extensions: None }
    }

    /// `extensions.code`, when the server supplied one.
    pub fn code(&self) -> Option<&str> {
        self.extension_str("code")
    }

    /// Whether the server classified this error as a validation failure.
    pub fn is_validation(&self) -> bool {
        [self.code(), self.extension_str("classification")]
            .into_iter()
            .flatten()
            .any(|code| VALIDATION_ERROR_CODES.contains(&code))
    }

    /// Dotted rendering of `path`, e.g. `contract.milestones.0.id`.
    pub fn path_string(&self) -> String {
        self.path.iter().map(ToString::to_string).collect::<Vec<_>>().join(".")
    }

    fn extension_str(&self, key: &str) -> Option<&str> {
        self.extensions.as_ref()?.get(key)?.as_str()
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.path.is_empty() {
            write!(f, " (path: {})", self.path_string())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    pub line: u32,
    pub column: u32,
}

/// Path element: a field name or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(u64),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Non-empty list of errors returned alongside an HTTP 2xx response.
///
/// Displays every message, separated by `"; "`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphQLErrors(Vec<GraphQLError>);

impl GraphQLErrors {
    pub fn first(&self) -> Option<&GraphQLError> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GraphQLError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn into_inner(self) -> Vec<GraphQLError> {
        self.0
    }
}

impl From<Vec<GraphQLError>> for GraphQLErrors {
    fn from(errors: Vec<GraphQLError>) -> Self {
        Self(errors)
    }
}

impl<'a> IntoIterator for &'a GraphQLErrors {
    type Item = &'a GraphQLError;
    type IntoIter = std::slice::Iter<'a, GraphQLError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for GraphQLErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("empty GraphQL error list");
        }
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}
