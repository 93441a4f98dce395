//! Configuration loader
//!
//! Loads SDK configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If a required variable is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `UPWORK_CLIENT_ID`: OAuth client id (required)
//! - `UPWORK_CLIENT_SECRET`: OAuth client secret (required)
//! - `UPWORK_REDIRECT_URL`: Redirect URI registered for the application
//! - `UPWORK_API_URL`: GraphQL endpoint
//! - `UPWORK_ORGANIZATION_ID`: Tenant to act on behalf of
//! - `UPWORK_SCOPES`: Comma or space separated scope list
//! - `UPWORK_GRANT_TYPE`: `authorization_code`, `token`, `client_credentials`
//! - `UPWORK_RATE_LIMIT_PER_MINUTE`: Requests admitted per minute
//! - `UPWORK_MAX_ATTEMPTS`: Attempts per request, including the first
//!
//! ## File Locations
//! The loader probes `upwork.toml`, `upwork.json`, `config.toml` and
//! `config.json` in the current working directory, then in its parent and
//! grandparent.

use std::path::{Path, PathBuf};

use upwork_common::auth::{GrantType, OAuthConfig};
use upwork_domain::{ClientConfig, UpworkError};

use super::SdkConfig;

const REQUIRED_VARS: [&str; 2] = ["UPWORK_CLIENT_ID", "UPWORK_CLIENT_SECRET"];

const FILE_NAMES: [&str; 4] = ["upwork.toml", "upwork.json", "config.toml", "config.json"];

type Result<T> = std::result::Result<T, UpworkError>;

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. Only when a required
/// variable is missing does it fall back to a config file; an invalid value
/// in an otherwise complete environment is reported as is.
///
/// # Errors
/// Returns `UpworkError::Config` if:
/// - Configuration cannot be loaded from either source
/// - An environment variable or the file format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<SdkConfig> {
    load_with(|key| std::env::var(key).ok(), || load_from_file(None))
}

fn load_with<F, B>(lookup: F, fallback: B) -> Result<SdkConfig>
where
    F: Fn(&str) -> Option<String>,
    B: FnOnce() -> Result<SdkConfig>,
{
    let is_set = |key: &str| lookup(key).is_some_and(|value| !value.trim().is_empty());
    if let Some(missing) = REQUIRED_VARS.iter().find(|key| !is_set(**key)) {
        tracing::debug!(variable = *missing, "Required environment variable missing, trying file");
        return fallback();
    }

    let config = load_from_vars(lookup)?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from the process environment
///
/// # Errors
/// See [`load_from_vars`].
pub fn load_from_env() -> Result<SdkConfig> {
    load_from_vars(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary variable source
///
/// `lookup` returns the value of a variable, or `None` when unset. Empty
/// values count as unset.
///
/// # Errors
/// Returns `UpworkError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_vars<F>(lookup: F) -> Result<SdkConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    let required = |key: &str| {
        get(key).ok_or_else(|| {
            UpworkError::Config(format!("Missing required environment variable: {key}"))
        })
    };

    let mut oauth = OAuthConfig::new(
        required("UPWORK_CLIENT_ID")?,
        required("UPWORK_CLIENT_SECRET")?,
        get("UPWORK_REDIRECT_URL").unwrap_or_default(),
    );
    if let Some(scopes) = get("UPWORK_SCOPES") {
        oauth.scopes = parse_scopes(&scopes);
    }
    if let Some(grant_type) = get("UPWORK_GRANT_TYPE") {
        oauth.grant_type = GrantType::parse(&grant_type).ok_or_else(|| {
            UpworkError::Config(format!("Invalid grant type: {grant_type}"))
        })?;
    }

    let mut client = ClientConfig::default();
    if let Some(api_url) = get("UPWORK_API_URL") {
        client.api_url = api_url;
    }
    client.organization_id = get("UPWORK_ORGANIZATION_ID");
    if let Some(limit) = get("UPWORK_RATE_LIMIT_PER_MINUTE") {
        client.rate_limit.max_requests = limit
            .parse()
            .map_err(|e| UpworkError::Config(format!("Invalid rate limit: {e}")))?;
        client.rate_limit.window_secs = 60;
    }
    if let Some(attempts) = get("UPWORK_MAX_ATTEMPTS") {
        client.retry.max_attempts = attempts
            .parse()
            .map_err(|e| UpworkError::Config(format!("Invalid max attempts: {e}")))?;
    }

    let config = SdkConfig::new(client, oauth);
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `UpworkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<SdkConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(UpworkError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            UpworkError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| UpworkError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content, by file extension.
fn parse_config(contents: &str, path: &Path) -> Result<SdkConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| UpworkError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| UpworkError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(UpworkError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// Returns the first existing file, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    probe_from(&cwd)
}

fn probe_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(3)
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|scope| !scope.is_empty())
        .map(str::to_string)
        .collect()
}
