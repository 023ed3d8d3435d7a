//! Unified path management for circlet files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/circlet/           # Config directory
//! ├── config.toml              # Application configuration
//! └── logs/                    # Application logs
//!     └── circlet.YYYY-MM-DD.log
//!
//! ~/.local/share/circlet/      # Data directory (private client state)
//! ├── token.json               # {"token", "expiresAt"}
//! └── deviceId.json            # {"id"}
//! ```

use std::path::{Path, PathBuf};

const APP_DIR: &str = "circlet";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for circlet_core::CircletError {
    fn from(err: PathError) -> Self {
        circlet_core::CircletError::config(err.to_string())
    }
}

/// Resolves every file location used by the client.
///
/// Platform directories come from `dirs` (XDG on Linux, `~/Library` on
/// macOS, `%APPDATA%` on Windows). A base path replaces both roots, which is
/// how tests keep everything inside a temp dir.
#[derive(Debug, Clone, Default)]
pub struct CircletPaths {
    config_root: Option<PathBuf>,
    data_root: Option<PathBuf>,
}

impl CircletPaths {
    pub fn new(base_path: Option<&Path>) -> Self {
        Self {
            config_root: base_path.map(Path::to_path_buf),
            data_root: base_path.map(Path::to_path_buf),
        }
    }

    /// Relocates only the data directory (token and device id records).
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_root = Some(data_dir.into());
        self
    }

    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.config_root {
            Some(root) => Ok(root.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.data_root {
            Some(root) => Ok(root.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// # Security Note
    ///
    /// Holds a bearer token in plaintext. Written with mode 600 on Unix.
    pub fn token_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("token.json"))
    }

    pub fn device_id_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("deviceId.json"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("logs"))
    }
}
