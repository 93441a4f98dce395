//! Conversions from external infrastructure errors into domain errors.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Error as HttpError;
use reqwest::StatusCode;
use serde::Deserialize;
use upwork_domain::UpworkError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub UpworkError);

impl From<InfraError> for UpworkError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<UpworkError> for InfraError {
    fn from(value: UpworkError) -> Self {
        Self(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoUpworkError {
    fn into_upwork(self) -> UpworkError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → UpworkError */
/* -------------------------------------------------------------------------- */

impl IntoUpworkError for HttpError {
    fn into_upwork(self) -> UpworkError {
        if self.is_timeout() {
            return UpworkError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return UpworkError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_builder() {
            return UpworkError::Config(format!("invalid HTTP request: {self}"));
        }

        if self.is_decode() {
            return UpworkError::Protocol(format!("failed to decode response body: {self}"));
        }

        if let Some(status) = self.status() {
            return classify_status(status, None, "");
        }

        UpworkError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_upwork())
    }
}

/* -------------------------------------------------------------------------- */
/* HTTP status → UpworkError */
/* -------------------------------------------------------------------------- */

/// Error body shapes the API returns on non-2xx responses
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Human readable message for a failed response: the body's `message`, then
/// its `error`, then the canonical status text; `code` is appended when
/// present.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let base = parsed
        .message
        .filter(|m| !m.is_empty())
        .or_else(|| parsed.error.filter(|e| !e.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown status").to_string());

    match parsed.code.filter(|c| !c.is_empty()) {
        Some(code) => format!("{base} (code: {code})"),
        None => base,
    }
}

/// Classify a non-2xx response.
///
/// | Status | Error |
/// |---|---|
/// | 400 | `Validation` |
/// | 401 | `Authentication` |
/// | 403 | `Permission` |
/// | 429 | `RateLimited` (with `Retry-After`) |
/// | 5xx | `Server` |
/// | other | `Client` |
pub fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> UpworkError {
    let message = error_message(status, body);
    let code = status.as_u16();

    match code {
        400 => UpworkError::Validation { field: None, message },
        401 => UpworkError::Authentication { status: Some(code), message },
        403 => UpworkError::Permission { message },
        429 => UpworkError::RateLimited { message, retry_after },
        500..=599 => UpworkError::Server { status: code, message },
        _ => UpworkError::Client { status: code, message },
    }
}

/// `Retry-After` in delta-seconds form; HTTP-date values are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
