//! Command dispatcher.
//!
//! One method per user-facing action. Each method reads credentials from the
//! [`SessionStore`], builds a request through the [`RequestBuilder`] and hands
//! it to the [`HttpGateway`]. Every call is a single exchange: no retry, no
//! token refresh.

use chrono::{DateTime, Utc};
use circlet_core::auth::{CurrentUser, LoginCredentials, LoginOutcome, TokenRequest, TokenResponse};
use circlet_core::circle::{Circle, CircleList, DeviceList, Member, MemberList};
use circlet_core::config::ApiConfig;
use circlet_core::location::{LocationTelemetry, UserContext};
use circlet_core::message::{Message, SendMessageRequest, Thread, ThreadList, ThreadMessages};
use circlet_core::session::AuthStatus;
use circlet_core::{CircletError, Result};
use circlet_interaction::api::{self, HEADER_USER_CONTEXT};
use circlet_interaction::request_builder::HEADER_DEVICE_ID;
use circlet_interaction::{Credentials, GatewayResponse, HttpGateway, RequestBuilder, RequestOptions};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::session_store::SessionStore;

/// Result of a circle selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResolution {
    pub circle_id: String,
    pub device_id: String,
    /// `false` when another circle was selected before this resolution
    /// finished; the device id was then discarded.
    pub adopted: bool,
}

pub struct CommandDispatcher {
    store: Arc<SessionStore>,
    gateway: Arc<dyn HttpGateway>,
    builder: RequestBuilder,
    location_url: String,
    dev_mode: AtomicBool,
}

impl CommandDispatcher {
    pub fn new(store: Arc<SessionStore>, gateway: Arc<dyn HttpGateway>, api: &ApiConfig) -> Self {
        Self {
            store,
            gateway,
            builder: RequestBuilder::new(api.base_url.clone()),
            location_url: api.location_url.clone(),
            dev_mode: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    // ============================================================================
    // Request plumbing
    // ============================================================================

    async fn execute(&self, options: RequestOptions) -> Result<GatewayResponse> {
        let credentials = self.store.credentials().await;
        let request = self.builder.build(
            &options,
            Credentials {
                access_token: credentials.access_token.as_deref(),
                device_id: credentials.device_id.as_deref(),
            },
        )?;
        self.gateway.send(request).await
    }

    async fn request_json<T: DeserializeOwned>(&self, options: RequestOptions) -> Result<T> {
        self.execute(options).await?.json()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.store.clock().now_millis()).unwrap_or_default()
    }

    // ============================================================================
    // Authentication
    // ============================================================================

    /// Exchanges username and password for a bearer token, persists it and
    /// resolves the current user.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<LoginOutcome> {
        tracing::info!("[Dispatcher] Logging in as {}", credentials.username);

        let body = serde_json::to_value(TokenRequest::password_grant(credentials))?;
        let options = RequestOptions::post(api::TOKEN_PATH)
            .with_body(body)
            .with_basic_auth();
        let token: TokenResponse = self.request_json(options).await?;
        if token.access_token.is_empty() {
            return Err(CircletError::parse(
                "token response has an empty access_token",
                String::new(),
            ));
        }

        let expires_at = self
            .store
            .save(&token.access_token, token.lifetime_secs())
            .await;
        let user_id = self.fetch_current_user_id().await?;

        tracing::info!("[Dispatcher] Logged in as user {}", user_id);
        Ok(LoginOutcome {
            user_id,
            expires_at,
        })
    }

    pub async fn fetch_current_user_id(&self) -> Result<String> {
        let user: CurrentUser = self.request_json(RequestOptions::get(api::USER_SELF_PATH)).await?;
        self.store.set_current_user(&user.id).await;
        Ok(user.id)
    }

    /// Restores the persisted session and checks it against the service.
    ///
    /// Any failure yields an unauthenticated status; the stored token is not
    /// cleared.
    pub async fn check_auth_status(&self) -> AuthStatus {
        let persisted = self.store.load_persisted().await;
        if !persisted.has_token() {
            return AuthStatus::unauthenticated();
        }

        match self.fetch_current_user_id().await {
            Ok(user_id) => AuthStatus::authenticated(user_id),
            Err(e) => {
                tracing::warn!("[Dispatcher] Stored session rejected: {}", e);
                AuthStatus::unauthenticated()
            }
        }
    }

    pub async fn logout(&self) {
        tracing::info!("[Dispatcher] Logging out");
        self.store.logout().await;
    }

    // ============================================================================
    // Circles
    // ============================================================================

    pub async fn list_circles(&self) -> Result<CircleList> {
        self.request_json(RequestOptions::get(api::CIRCLES_PATH)).await
    }

    /// Fetches one circle with its members. The result is cached as the
    /// current snapshot only while `circle_id` is still selected.
    pub async fn circle_details(&self, circle_id: &str) -> Result<Circle> {
        let circle: Circle = self
            .request_json(RequestOptions::get(api::circle_path(circle_id)))
            .await?;
        if !self.store.store_circle_snapshot(circle.clone()).await {
            tracing::debug!("[Dispatcher] Circle {} is not selected, snapshot not cached", circle_id);
        }
        Ok(circle)
    }

    /// Selects a circle and resolves the device id the current user owns in
    /// it.
    ///
    /// Fails with `DeviceNotFound` when the user owns no device there; the
    /// previous device id is kept in that case.
    pub async fn select_circle(&self, circle_id: &str) -> Result<DeviceResolution> {
        if circle_id.trim().is_empty() {
            return Err(CircletError::precondition("circle id is empty"));
        }
        let user_id = match (self.store.is_ready().await, self.store.current_user_id().await) {
            (true, Some(user_id)) => user_id,
            _ => {
                return Err(CircletError::precondition(
                    "session is not ready: log in before selecting a circle",
                ));
            }
        };

        let generation = self.store.set_current_circle(circle_id).await;
        tracing::info!(
            "[Dispatcher] Selected circle {} (generation {})",
            circle_id,
            generation
        );

        let devices: DeviceList = self
            .request_json(api::device_list_request(circle_id, self.now_utc()))
            .await?;
        let device_id = devices
            .find_owned_by(&user_id)
            .map(str::to_string)
            .ok_or_else(|| CircletError::device_not_found(circle_id))?;

        let adopted = self.store.adopt_device_id(&device_id, generation).await;
        if adopted {
            tracing::info!("[Dispatcher] Using device {} for circle {}", device_id, circle_id);
        }

        Ok(DeviceResolution {
            circle_id: circle_id.to_string(),
            device_id,
            adopted,
        })
    }

    pub async fn circle_members(&self, circle_id: &str) -> Result<Vec<Member>> {
        let list: MemberList = self
            .request_json(RequestOptions::get(api::members_path(circle_id)))
            .await?;
        Ok(list.members)
    }

    pub async fn member(&self, circle_id: &str, member_id: &str) -> Result<Member> {
        self.request_json(RequestOptions::get(api::member_path(circle_id, member_id)))
            .await
    }

    // ============================================================================
    // Location
    // ============================================================================

    /// Reports a custom location for the current device.
    ///
    /// The telemetry travels base64-encoded in the `X-UserContext` header; the
    /// request has no body. Returns the response JSON (`null` when empty).
    pub async fn update_location(&self, telemetry: &LocationTelemetry) -> Result<Value> {
        telemetry.validate()?;
        let device_id = self.store.device_id().await.ok_or_else(|| {
            CircletError::precondition("no device id: select a circle before updating location")
        })?;

        let context = UserContext::from_telemetry(telemetry, self.store.clock().now_secs());
        let options = RequestOptions::put(self.location_url.clone())
            .with_header(HEADER_DEVICE_ID, device_id)
            .with_header(HEADER_USER_CONTEXT, context.encode()?);

        tracing::info!(
            "[Dispatcher] Updating location to {}, {}",
            telemetry.lat,
            telemetry.lon
        );
        self.execute(options).await?.json_value()
    }

    // ============================================================================
    // Messages
    // ============================================================================

    pub async fn list_threads(&self) -> Result<ThreadList> {
        self.request_json(RequestOptions::get(api::THREADS_PATH)).await
    }

    /// Posts a message to `receiver_ids` in a circle.
    ///
    /// Blank text, an empty circle id or no receivers fail before any I/O.
    pub async fn send_message(
        &self,
        circle_id: &str,
        text: &str,
        receiver_ids: &[String],
    ) -> Result<Value> {
        if text.trim().is_empty() {
            return Err(CircletError::precondition("message text is empty"));
        }
        if circle_id.trim().is_empty() {
            return Err(CircletError::precondition("circle id is empty"));
        }
        if receiver_ids.is_empty() {
            return Err(CircletError::precondition("message has no receivers"));
        }

        let body = serde_json::to_value(SendMessageRequest::new(text, receiver_ids)?)?;
        let options = RequestOptions::post(api::send_message_path(circle_id)).with_body(body);
        self.execute(options).await?.json_value()
    }

    /// Makes `circle_id` the current circle for chat without resolving a
    /// device id. Already current: nothing changes and the selected thread
    /// stays open. Otherwise the selection generation moves on, so a pending
    /// device resolution for the previous circle is dropped.
    pub async fn focus_circle(&self, circle_id: &str) -> Result<()> {
        if circle_id.trim().is_empty() {
            return Err(CircletError::precondition("circle id is empty"));
        }
        if self.store.current_circle_id().await.as_deref() == Some(circle_id) {
            return Ok(());
        }

        let generation = self.store.set_current_circle(circle_id).await;
        tracing::info!(
            "[Dispatcher] Focused circle {} for chat (generation {})",
            circle_id,
            generation
        );
        Ok(())
    }

    /// Selects a thread of the current circle and loads its messages.
    pub async fn open_thread(&self, thread: Thread) -> Result<Vec<Message>> {
        self.store.select_thread(thread).await?;
        self.refresh_selected_thread().await
    }

    /// Focuses `circle_id`, then opens `thread` in it. A thread tagged with
    /// another circle is rejected before any I/O.
    pub async fn open_circle_thread(&self, circle_id: &str, thread: Thread) -> Result<Vec<Message>> {
        if let Some(tagged) = thread.circle_id.as_deref().filter(|id| *id != circle_id) {
            return Err(CircletError::precondition(format!(
                "thread {} belongs to circle {}, not {}",
                thread.id, tagged, circle_id
            )));
        }
        self.focus_circle(circle_id).await?;
        self.open_thread(thread).await
    }

    /// Sends `text` to every other participant of the selected thread.
    pub async fn send_to_selected_thread(&self, text: &str) -> Result<Value> {
        let chat = self.store.chat().await;
        let user_id = self
            .store
            .current_user_id()
            .await
            .ok_or_else(|| CircletError::precondition("no current user"))?;
        let receivers = chat.receiver_ids(&user_id)?;
        let circle_id = chat
            .circle_id()
            .ok_or_else(|| CircletError::precondition("no chat thread selected"))?;

        self.send_message(circle_id, text, &receivers).await
    }

    /// Fetches the recent messages of a thread. If the thread is the selected
    /// one, they are merged into the chat view.
    pub async fn thread_messages(&self, circle_id: &str, thread_id: &str) -> Result<Vec<Message>> {
        let page: ThreadMessages = self
            .request_json(RequestOptions::get(api::thread_path(circle_id, thread_id)))
            .await?;
        self.store
            .apply_messages(circle_id, thread_id, page.messages.clone())
            .await;
        Ok(page.messages)
    }

    /// Re-fetches the selected thread and returns the merged view.
    pub async fn refresh_selected_thread(&self) -> Result<Vec<Message>> {
        let chat = self.store.chat().await;
        let (Some(circle_id), Some(thread)) = (chat.circle_id(), chat.thread()) else {
            return Err(CircletError::precondition("no chat thread selected"));
        };
        self.thread_messages(circle_id, &thread.id).await?;
        Ok(self.store.chat().await.messages().to_vec())
    }

    // ============================================================================
    // Developer mode
    // ============================================================================

    pub fn dev_mode(&self) -> bool {
        self.dev_mode.load(Ordering::SeqCst)
    }

    /// Flips developer mode and returns the new value.
    pub fn toggle_dev_mode(&self) -> bool {
        let enabled = !self.dev_mode.fetch_xor(true, Ordering::SeqCst);
        tracing::info!("[Dispatcher] Developer mode {}", if enabled { "enabled" } else { "disabled" });
        enabled
    }

    /// Sends an arbitrary request and returns the raw JSON response.
    pub async fn dev_request(&self, options: RequestOptions) -> Result<Value> {
        if !self.dev_mode() {
            return Err(CircletError::precondition("developer mode is disabled"));
        }
        tracing::debug!("[Dispatcher] Dev request {} {}", options.method, options.path);
        self.execute(options).await?.json_value()
    }
}
