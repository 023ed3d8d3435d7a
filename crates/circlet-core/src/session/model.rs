//! Session domain models.

use serde::{Deserialize, Serialize};

/// Credentials and selection state of the running client.
///
/// Only the access token (with its expiry) and the device id outlive the
/// process. The current user and circle are reset on restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    access_token: Option<String>,
    token_expiry: Option<i64>,
    device_id: Option<String>,
    current_user_id: Option<String>,
    current_circle_id: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Absolute expiry of the access token in epoch milliseconds.
    pub fn token_expiry(&self) -> Option<i64> {
        self.token_expiry
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn current_user_id(&self) -> Option<&str> {
        self.current_user_id.as_deref()
    }

    pub fn current_circle_id(&self) -> Option<&str> {
        self.current_circle_id.as_deref()
    }

    pub fn has_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// True once a token is held AND the current user id has been resolved.
    ///
    /// Circle data and device resolution are only trusted in this state.
    pub fn is_ready(&self) -> bool {
        self.access_token.is_some() && self.current_user_id.is_some()
    }

    pub fn set_token(&mut self, token: impl Into<String>, expiry_millis: i64) {
        self.access_token = Some(token.into());
        self.token_expiry = Some(expiry_millis);
    }

    /// Drops the token and everything derived from it.
    pub fn clear_token(&mut self) {
        self.access_token = None;
        self.token_expiry = None;
        self.current_user_id = None;
    }

    pub fn set_device_id(&mut self, device_id: impl Into<String>) {
        self.device_id = Some(device_id.into());
    }

    pub fn set_current_user_id(&mut self, user_id: impl Into<String>) {
        self.current_user_id = Some(user_id.into());
    }

    pub fn set_current_circle_id(&mut self, circle_id: impl Into<String>) {
        self.current_circle_id = Some(circle_id.into());
    }
}

/// Durable `{token, expiresAt}` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    /// Epoch milliseconds.
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

impl StoredToken {
    pub fn new(token: impl Into<String>, expires_at: i64) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// A token is usable only strictly before its expiry.
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        !self.token.is_empty() && self.expires_at > now_millis
    }
}

/// Durable `{id}` record holding the adopted device id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDeviceId {
    pub id: String,
}

impl StoredDeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
}

/// Result of restoring a persisted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub is_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthUser>,
}

impl AuthStatus {
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            is_authenticated: true,
            user: Some(AuthUser { id: user_id.into() }),
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            is_authenticated: false,
            user: None,
        }
    }
}
