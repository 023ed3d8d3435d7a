//! Loads `config.toml` and resolves the effective configuration.

use circlet_core::Result;
use circlet_core::config::AppConfig;
use std::path::PathBuf;

use crate::paths::CircletPaths;

/// Reads the application configuration.
///
/// A missing file yields defaults; a malformed file is a `Config` error.
/// `CIRCLET_*` environment variables override file values.
pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    pub fn new(paths: &CircletPaths) -> Result<Self> {
        Ok(Self {
            path: paths.config_file()?,
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads the file only, without environment overrides.
    pub fn load_file(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            tracing::debug!(
                "[ConfigService] No config at {:?}, using defaults",
                self.path
            );
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        AppConfig::from_toml_str(&content)
    }

    /// Loads the file and applies environment overrides.
    pub fn load(&self) -> Result<AppConfig> {
        Ok(self.load_file()?.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Paths with the configured data directory applied.
    pub fn resolve_paths(paths: CircletPaths, config: &AppConfig) -> CircletPaths {
        match &config.data_dir {
            Some(dir) => paths.with_data_dir(dir),
            None => paths,
        }
    }
}
