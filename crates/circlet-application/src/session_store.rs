//! Owner of the client session.
//!
//! All session mutation goes through this store. Durable writes are
//! fire-and-forget: a failed write is logged and the in-memory state still
//! changes.

use circlet_core::circle::Circle;
use circlet_core::clock::Clock;
use circlet_core::message::{ChatState, Message, Thread};
use circlet_core::session::{CredentialRepository, Session, StoredDeviceId, StoredToken};
use circlet_core::{CircletError, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Credential material copied out of the session for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSnapshot {
    pub access_token: Option<String>,
    pub device_id: Option<String>,
}

#[derive(Debug, Default)]
struct StoreState {
    session: Session,
    /// Bumped on every circle selection.
    selection_generation: u64,
    circle_snapshot: Option<Circle>,
    chat: ChatState,
}

pub struct SessionStore {
    state: RwLock<StoreState>,
    repository: Arc<dyn CredentialRepository>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(repository: Arc<dyn CredentialRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            repository,
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ============================================================================
    // Persistence
    // ============================================================================

    /// Reads the durable records and adopts whatever is still valid.
    ///
    /// Returns the session as persisted: no token if the record is absent,
    /// corrupt, or expired. Never fails.
    pub async fn load_persisted(&self) -> Session {
        let now = self.clock.now_millis();
        let mut persisted = Session::new();

        match self.repository.load_token().await {
            Ok(Some(stored)) if stored.is_valid_at(now) => {
                persisted.set_token(stored.token, stored.expires_at);
            }
            Ok(Some(_)) => {
                tracing::info!("[SessionStore] Stored token has expired");
            }
            Ok(None) => {
                tracing::debug!("[SessionStore] No stored token found");
            }
            Err(e) => {
                tracing::warn!("[SessionStore] Ignoring unreadable token record: {}", e);
            }
        }

        match self.repository.load_device_id().await {
            Ok(Some(stored)) if !stored.id.is_empty() => persisted.set_device_id(stored.id),
            Ok(_) => tracing::debug!("[SessionStore] No stored device id found"),
            Err(e) => {
                tracing::warn!("[SessionStore] Ignoring unreadable device id record: {}", e);
            }
        }

        let mut state = self.state.write().await;
        if let (Some(token), Some(expiry)) = (persisted.access_token(), persisted.token_expiry()) {
            state.session.set_token(token, expiry);
        }
        if state.session.device_id().is_none() {
            if let Some(device_id) = persisted.device_id() {
                state.session.set_device_id(device_id);
            }
        }

        persisted
    }

    /// Holds `token` in memory and persists it with an absolute expiry of
    /// now + `expires_in_secs`. Returns the expiry in epoch milliseconds.
    pub async fn save(&self, token: &str, expires_in_secs: i64) -> i64 {
        let expires_at = self
            .clock
            .now_millis()
            .saturating_add(expires_in_secs.saturating_mul(1000));

        {
            let mut state = self.state.write().await;
            state.session.set_token(token, expires_at);
        }

        if let Err(e) = self
            .repository
            .save_token(&StoredToken::new(token, expires_at))
            .await
        {
            tracing::warn!("[SessionStore] Failed to persist token: {}", e);
        }

        expires_at
    }

    /// Holds and persists a device id, overwriting the previous record.
    pub async fn save_device_id(&self, device_id: &str) {
        {
            let mut state = self.state.write().await;
            state.session.set_device_id(device_id);
        }
        self.persist_device_id(device_id).await;
    }

    async fn persist_device_id(&self, device_id: &str) {
        if let Err(e) = self
            .repository
            .save_device_id(&StoredDeviceId::new(device_id))
            .await
        {
            tracing::warn!("[SessionStore] Failed to persist device id: {}", e);
        }
    }

    // ============================================================================
    // Selection
    // ============================================================================

    /// Makes `circle_id` the current circle and returns the new selection
    /// generation.
    ///
    /// Drops the cached circle snapshot and the selected chat thread. The
    /// caller is expected to re-resolve the device id, tagged with the
    /// returned generation.
    pub async fn set_current_circle(&self, circle_id: &str) -> u64 {
        let mut state = self.state.write().await;
        state.session.set_current_circle_id(circle_id);
        state.selection_generation += 1;
        state.circle_snapshot = None;
        state.chat.clear();
        state.selection_generation
    }

    /// Adopts and persists `device_id` if `generation` is still the current
    /// selection. A resolution for a superseded selection is dropped.
    pub async fn adopt_device_id(&self, device_id: &str, generation: u64) -> bool {
        {
            let mut state = self.state.write().await;
            if state.selection_generation != generation {
                tracing::debug!(
                    "[SessionStore] Dropping stale device id (generation {} != {})",
                    generation,
                    state.selection_generation
                );
                return false;
            }
            state.session.set_device_id(device_id);
        }
        self.persist_device_id(device_id).await;
        true
    }

    /// Caches a fetched circle if it is still the current circle.
    pub async fn store_circle_snapshot(&self, circle: Circle) -> bool {
        let mut state = self.state.write().await;
        if state.session.current_circle_id() != Some(circle.id.as_str()) {
            return false;
        }
        state.circle_snapshot = Some(circle);
        true
    }

    pub async fn circle_snapshot(&self) -> Option<Circle> {
        self.state.read().await.circle_snapshot.clone()
    }

    // ============================================================================
    // Chat
    // ============================================================================

    /// Selects a thread of the current circle.
    pub async fn select_thread(&self, thread: Thread) -> Result<()> {
        let mut state = self.state.write().await;
        let circle_id = state
            .session
            .current_circle_id()
            .map(str::to_string)
            .ok_or_else(|| CircletError::precondition("no circle selected"))?;
        state.chat.select_thread(circle_id, thread);
        Ok(())
    }

    pub async fn chat(&self) -> ChatState {
        self.state.read().await.chat.clone()
    }

    /// Merges fetched messages into the selected thread. Returns `false` if
    /// the fetch targeted a selection that is no longer current.
    pub async fn apply_messages(
        &self,
        circle_id: &str,
        thread_id: &str,
        messages: Vec<Message>,
    ) -> bool {
        self.state
            .write()
            .await
            .chat
            .apply_fetch(circle_id, thread_id, messages)
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    pub async fn set_current_user(&self, user_id: &str) {
        self.state.write().await.session.set_current_user_id(user_id);
    }

    pub async fn snapshot(&self) -> Session {
        self.state.read().await.session.clone()
    }

    pub async fn credentials(&self) -> CredentialSnapshot {
        let state = self.state.read().await;
        CredentialSnapshot {
            access_token: state.session.access_token().map(str::to_string),
            device_id: state.session.device_id().map(str::to_string),
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .session
            .access_token()
            .map(str::to_string)
    }

    pub async fn device_id(&self) -> Option<String> {
        self.state.read().await.session.device_id().map(str::to_string)
    }

    pub async fn current_user_id(&self) -> Option<String> {
        self.state
            .read()
            .await
            .session
            .current_user_id()
            .map(str::to_string)
    }

    pub async fn current_circle_id(&self) -> Option<String> {
        self.state
            .read()
            .await
            .session
            .current_circle_id()
            .map(str::to_string)
    }

    pub async fn is_ready(&self) -> bool {
        self.state.read().await.session.is_ready()
    }

    /// Forgets the token and user in memory. The durable token record is
    /// left as is.
    pub async fn logout(&self) {
        let mut state = self.state.write().await;
        state.session.clear_token();
        state.circle_snapshot = None;
        state.chat.clear();
    }
}
