use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_API_BASE_URL: &str = "https://api-cloudfront.life360.com/";
pub const DEFAULT_LOCATION_URL: &str = "https://iphone.life360.com/v4/locations";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_API_BASE_URL: &str = "CIRCLET_API_BASE_URL";
pub const ENV_LOCATION_URL: &str = "CIRCLET_LOCATION_URL";
pub const ENV_DATA_DIR: &str = "CIRCLET_DATA_DIR";

/// Remote endpoints and HTTP client settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Origin that relative request paths are resolved against.
    pub base_url: String,
    /// Dedicated ingest endpoint for location updates (different host).
    pub location_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            location_url: DEFAULT_LOCATION_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Root of `config.toml`. Every key is optional.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub log: LogConfig,
    /// Overrides the directory holding `token.json` and `deviceId.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

impl AppConfig {
    /// Parses a `config.toml` document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(content)?)
    }

    /// Applies `CIRCLET_*` overrides using the given variable lookup.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = base_url;
        }
        if let Some(location_url) = lookup(ENV_LOCATION_URL).filter(|v| !v.trim().is_empty()) {
            self.api.location_url = location_url;
        }
        if let Some(data_dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(data_dir);
        }
        self
    }
}
