//! Credential repository trait.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::{CircletError, Result};
use crate::session::model::{StoredDeviceId, StoredToken};

/// Durable storage for the two credential records.
///
/// The records are independent: each save overwrites only its own record.
/// `Ok(None)` means the record does not exist; a corrupt record is an error
/// the caller decides how to degrade.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    async fn load_token(&self) -> Result<Option<StoredToken>>;

    async fn save_token(&self, token: &StoredToken) -> Result<()>;

    async fn load_device_id(&self) -> Result<Option<StoredDeviceId>>;

    async fn save_device_id(&self, device: &StoredDeviceId) -> Result<()>;
}

/// Process-local repository, used when nothing should touch the disk.
#[derive(Debug, Default)]
pub struct InMemoryCredentialRepository {
    token: Mutex<Option<StoredToken>>,
    device: Mutex<Option<StoredDeviceId>>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(token: Option<StoredToken>, device: Option<StoredDeviceId>) -> Self {
        Self {
            token: Mutex::new(token),
            device: Mutex::new(device),
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> CircletError {
    CircletError::internal("credential repository lock poisoned")
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn load_token(&self) -> Result<Option<StoredToken>> {
        Ok(self.token.lock().map_err(poisoned)?.clone())
    }

    async fn save_token(&self, token: &StoredToken) -> Result<()> {
        *self.token.lock().map_err(poisoned)? = Some(token.clone());
        Ok(())
    }

    async fn load_device_id(&self) -> Result<Option<StoredDeviceId>> {
        Ok(self.device.lock().map_err(poisoned)?.clone())
    }

    async fn save_device_id(&self, device: &StoredDeviceId) -> Result<()> {
        *self.device.lock().map_err(poisoned)? = Some(device.clone());
        Ok(())
    }
}
