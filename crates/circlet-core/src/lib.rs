pub mod auth;
pub mod circle;
pub mod clock;
pub mod config;
pub mod error;
pub mod location;
pub mod message;
pub mod session;
pub mod wire;

// Re-export common error type
pub use error::{CircletError, Result};
