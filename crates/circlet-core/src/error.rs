//! Error types for the circlet client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire circlet client.
///
/// Every remote failure is surfaced to the immediate caller through one of
/// these variants. Nothing is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircletError {
    /// Bearer auth was requested but no access token is held
    #[error("No access token available")]
    NoCredentials,

    /// Network-level failure (DNS, connect, TLS, timeout)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The remote service answered with a non-2xx status
    #[error("HTTP Error: {status}: {body}")]
    Http { status: u16, body: String },

    /// A 2xx response whose body does not have the expected JSON shape
    #[error("Failed to parse JSON response: {message}. Response body: {body}")]
    Parse { message: String, body: String },

    /// The circle has no device owned by the current user
    #[error("Device ID not found for the current user in circle '{circle_id}'")]
    DeviceNotFound { circle_id: String },

    /// An operation was attempted in a state that does not allow it
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CircletError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an Http error
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Creates a Parse error
    pub fn parse(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: body.into(),
        }
    }

    /// Creates a DeviceNotFound error
    pub fn device_not_found(circle_id: impl Into<String>) -> Self {
        Self::DeviceNotFound {
            circle_id: circle_id.into(),
        }
    }

    /// Creates a Precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_no_credentials(&self) -> bool {
        matches!(self, Self::NoCredentials)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    pub fn is_device_not_found(&self) -> bool {
        matches!(self, Self::DeviceNotFound { .. })
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// Returns the HTTP status code if this is an `Http` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if the remote service rejected the credentials.
    ///
    /// Callers are expected to re-prompt for login; the stored token is never
    /// cleared automatically.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for CircletError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for CircletError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CircletError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Conversion from anyhow::Error (bootstrap code only)
impl From<anyhow::Error> for CircletError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, CircletError>`.
pub type Result<T> = std::result::Result<T, CircletError>;
