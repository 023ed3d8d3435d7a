//! UI bridge.
//!
//! Front ends talk to the dispatcher through tagged JSON commands
//! (`{"command": "getCircles"}`) and receive JSON results. Notifications flow
//! the other way over a broadcast channel.

use circlet_core::Result;
use circlet_core::auth::LoginCredentials;
use circlet_core::location::LocationTelemetry;
use circlet_core::message::Thread;
use circlet_interaction::RequestOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::dispatcher::CommandDispatcher;

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BridgeRequest {
    Login { username: String, password: String },
    CheckAuthStatus,
    FetchCurrentUserId,
    Logout,
    GetCircles,
    GetCircleDetails { circle_id: String },
    SetCurrentCircle { circle_id: String },
    GetCircleMembers { circle_id: String },
    GetMemberInfo { circle_id: String, member_id: String },
    UpdateLocation(LocationTelemetry),
    GetThreads,
    SendMessage {
        circle_id: String,
        message: String,
        receiver_ids: Vec<String>,
    },
    GetThreadMessages { circle_id: String, thread_id: String },
    /// Focuses the circle, selects the thread and returns its messages.
    OpenThread { circle_id: String, thread: Thread },
    RefreshSelectedThread,
    SendToSelectedThread { message: String },
    ToggleDevMode,
    DevRequest(RequestOptions),
}

/// Fire-and-forget messages from the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeNotification {
    LocationUpdated,
    ShowNotification {
        title: String,
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
}

/// Events delivered to subscribed front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum BridgeEvent {
    RefreshMap,
    Notification {
        title: String,
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
}

pub struct Bridge {
    dispatcher: Arc<CommandDispatcher>,
    events: broadcast::Sender<BridgeEvent>,
}

impl Bridge {
    pub fn new(dispatcher: Arc<CommandDispatcher>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { dispatcher, events }
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    /// Runs one command and serializes its result.
    pub async fn handle(&self, request: BridgeRequest) -> Result<Value> {
        let dispatcher = &self.dispatcher;
        let value = match request {
            BridgeRequest::Login { username, password } => {
                to_json(dispatcher.login(&LoginCredentials::new(username, password)).await?)?
            }
            BridgeRequest::CheckAuthStatus => to_json(dispatcher.check_auth_status().await)?,
            BridgeRequest::FetchCurrentUserId => {
                Value::String(dispatcher.fetch_current_user_id().await?)
            }
            BridgeRequest::Logout => {
                dispatcher.logout().await;
                Value::Null
            }
            BridgeRequest::GetCircles => to_json(dispatcher.list_circles().await?)?,
            BridgeRequest::GetCircleDetails { circle_id } => {
                to_json(dispatcher.circle_details(&circle_id).await?)?
            }
            BridgeRequest::SetCurrentCircle { circle_id } => {
                to_json(dispatcher.select_circle(&circle_id).await?)?
            }
            BridgeRequest::GetCircleMembers { circle_id } => {
                to_json(dispatcher.circle_members(&circle_id).await?)?
            }
            BridgeRequest::GetMemberInfo {
                circle_id,
                member_id,
            } => to_json(dispatcher.member(&circle_id, &member_id).await?)?,
            BridgeRequest::UpdateLocation(telemetry) => {
                dispatcher.update_location(&telemetry).await?
            }
            BridgeRequest::GetThreads => to_json(dispatcher.list_threads().await?)?,
            BridgeRequest::SendMessage {
                circle_id,
                message,
                receiver_ids,
            } => {
                dispatcher
                    .send_message(&circle_id, &message, &receiver_ids)
                    .await?
            }
            BridgeRequest::GetThreadMessages {
                circle_id,
                thread_id,
            } => to_json(dispatcher.thread_messages(&circle_id, &thread_id).await?)?,
            BridgeRequest::OpenThread { circle_id, thread } => {
                to_json(dispatcher.open_circle_thread(&circle_id, thread).await?)?
            }
            BridgeRequest::RefreshSelectedThread => {
                to_json(dispatcher.refresh_selected_thread().await?)?
            }
            BridgeRequest::SendToSelectedThread { message } => {
                dispatcher.send_to_selected_thread(&message).await?
            }
            BridgeRequest::ToggleDevMode => Value::Bool(dispatcher.toggle_dev_mode()),
            BridgeRequest::DevRequest(options) => dispatcher.dev_request(options).await?,
        };
        Ok(value)
    }

    /// Forwards a notification to subscribers. Never fails; with no
    /// subscriber the event is dropped.
    pub fn notify(&self, notification: BridgeNotification) {
        let event = match notification {
            BridgeNotification::LocationUpdated => BridgeEvent::RefreshMap,
            BridgeNotification::ShowNotification { title, body, icon } => {
                BridgeEvent::Notification { title, body, icon }
            }
        };
        if self.events.send(event).is_err() {
            tracing::debug!("[Bridge] No subscribers, notification dropped");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
