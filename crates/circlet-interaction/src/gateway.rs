//! The single I/O seam: executing a request descriptor.

use async_trait::async_trait;
use circlet_core::{CircletError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::request_builder::RequestDescriptor;

/// Raw response of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
}

impl GatewayResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fails with `Http{status, body}` for any non-2xx status.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(CircletError::http(self.status, self.body))
        }
    }

    /// Checks the status and parses the body as `T`.
    ///
    /// An empty 2xx body is parsed as JSON `null`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        let response = self.error_for_status()?;
        let text = if response.body.trim().is_empty() {
            "null"
        } else {
            response.body.as_str()
        };
        serde_json::from_str(text)
            .map_err(|err| CircletError::parse(err.to_string(), response.body.clone()))
    }

    pub fn json_value(self) -> Result<Value> {
        self.json()
    }
}

/// Executes requests against the remote service.
///
/// Implementations perform exactly one exchange per call: no retry, no
/// backoff. Transport failures map to `Transport`; any received response,
/// whatever its status, is returned as-is.
#[async_trait]
pub trait HttpGateway: Send + Sync {
    async fn send(&self, request: RequestDescriptor) -> Result<GatewayResponse>;
}
