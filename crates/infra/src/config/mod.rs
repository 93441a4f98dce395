//! Configuration loading and management
//!
//! This module provides utilities for loading SDK configuration from
//! environment variables and files.

pub mod loader;

use serde::{Deserialize, Serialize};
use upwork_common::auth::OAuthConfig;
use upwork_domain::{ClientConfig, UpworkError};

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, load_from_vars, probe_config_paths};

/// Everything needed to build an [`crate::UpworkClient`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub client: ClientConfig,
    pub oauth: OAuthConfig,
}

impl SdkConfig {
    pub fn new(client: ClientConfig, oauth: OAuthConfig) -> Self {
        Self { client, oauth }
    }

    /// # Errors
    ///
    /// Returns [`UpworkError::Config`] for the first invalid setting.
    pub fn validate(&self) -> Result<(), UpworkError> {
        self.client.validate()?;
        self.oauth.validate().map_err(UpworkError::Config)
    }
}
