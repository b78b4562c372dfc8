//! Cloud configuration
//!
//! The backend is configured entirely from the environment. Both variables
//! present means cloud mode; anything else means the engine runs local-only,
//! which is a supported mode and not an error.

use std::env;

/// Environment variable naming the backend URL.
pub const ENV_CLOUD_URL: &str = "LEADFLOW_CLOUD_URL";
/// Environment variable naming the backend anon key.
pub const ENV_CLOUD_KEY: &str = "LEADFLOW_CLOUD_KEY";

/// Connection settings for a cloud backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudConfig {
    /// Backend base URL
    pub url: String,
    /// Anonymous API key
    pub anon_key: String,
}

impl CloudConfig {
    /// Read the configuration from the environment.
    ///
    /// Returns None, meaning local-only mode, unless both variables are
    /// present and non-empty.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let url = env::var(ENV_CLOUD_URL).ok().filter(|v| !v.is_empty())?;
        let anon_key = env::var(ENV_CLOUD_KEY).ok().filter(|v| !v.is_empty())?;
        Some(Self { url, anon_key })
    }
}
