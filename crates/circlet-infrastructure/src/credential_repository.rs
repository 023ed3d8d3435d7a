//! File-backed credential records.

use async_trait::async_trait;
use circlet_core::session::{CredentialRepository, StoredDeviceId, StoredToken};
use circlet_core::{CircletError, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};

use crate::paths::CircletPaths;
use crate::storage::AtomicJsonFile;

/// Stores `token.json` and `deviceId.json` in the client's data directory.
///
/// No schema versioning and no encryption: the token is bearer-style and
/// short-lived, and the file is restricted to the owner.
#[derive(Debug, Clone)]
pub struct FileCredentialRepository {
    token_path: PathBuf,
    device_id_path: PathBuf,
}

impl FileCredentialRepository {
    pub fn new(paths: &CircletPaths) -> Result<Self> {
        Ok(Self {
            token_path: paths.token_file()?,
            device_id_path: paths.device_id_file()?,
        })
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    pub fn device_id_path(&self) -> &Path {
        &self.device_id_path
    }
}

async fn load_record<T>(path: PathBuf) -> Result<Option<T>>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    tokio::task::spawn_blocking(move || AtomicJsonFile::<T>::new(path).load())
        .await
        .map_err(|e| CircletError::internal(format!("record load task failed: {e}")))?
        .map_err(Into::into)
}

async fn save_record<T>(path: PathBuf, record: T, private: bool) -> Result<()>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let file = AtomicJsonFile::<T>::new(path);
        let file = if private { file.private() } else { file };
        file.save(&record)
    })
    .await
    .map_err(|e| CircletError::internal(format!("record save task failed: {e}")))?
    .map_err(Into::into)
}

#[async_trait]
impl CredentialRepository for FileCredentialRepository {
    async fn load_token(&self) -> Result<Option<StoredToken>> {
        load_record(self.token_path.clone()).await
    }

    async fn save_token(&self, token: &StoredToken) -> Result<()> {
        save_record(self.token_path.clone(), token.clone(), true).await?;
        tracing::debug!("[CredentialRepository] Token saved to {:?}", self.token_path);
        Ok(())
    }

    async fn load_device_id(&self) -> Result<Option<StoredDeviceId>> {
        load_record(self.device_id_path.clone()).await
    }

    async fn save_device_id(&self, device: &StoredDeviceId) -> Result<()> {
        save_record(self.device_id_path.clone(), device.clone(), false).await?;
        tracing::debug!(
            "[CredentialRepository] Device id saved to {:?}",
            self.device_id_path
        );
        Ok(())
    }
}
