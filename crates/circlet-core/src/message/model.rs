//! Thread and message models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::wire;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePhoto {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<MessagePhoto>,
    /// Epoch seconds.
    #[serde(default, deserialize_with = "wire::timestamp")]
    pub timestamp: i64,
}

impl Message {
    /// Text to show in a list: the text, or a marker for photo messages.
    pub fn preview(&self) -> &str {
        match (&self.text, &self.photo) {
            (Some(text), _) if !text.is_empty() => text,
            (_, Some(_)) => "[photo]",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadParticipant {
    #[serde(default, deserialize_with = "wire::string")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circle_id: Option<String>,
    /// Participants keyed by user id.
    #[serde(default)]
    pub names: BTreeMap<String, ThreadParticipant>,
    /// Last message preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

impl Thread {
    /// Every participant except `current_user_id`, in id order.
    pub fn receiver_ids(&self, current_user_id: &str) -> Vec<String> {
        self.names
            .keys()
            .filter(|id| id.as_str() != current_user_id)
            .cloned()
            .collect()
    }

    /// For a one-to-one thread, the other participant's name; otherwise all
    /// names joined with ", ".
    pub fn title(&self, current_user_id: &str) -> String {
        if self.names.len() == 2 {
            if let Some(other) = self
                .names
                .iter()
                .find(|(id, _)| id.as_str() != current_user_id)
                .map(|(_, p)| p.name.clone())
            {
                return other;
            }
        }

        self.names
            .values()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadList {
    pub threads: Vec<Thread>,
}

impl ThreadList {
    /// Threads tagged with `circle_id`. Untagged threads are dropped.
    pub fn for_circle(&self, circle_id: &str) -> Vec<Thread> {
        self.threads
            .iter()
            .filter(|t| t.circle_id.as_deref() == Some(circle_id))
            .cloned()
            .collect()
    }
}

/// Response of the thread-by-id endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessages {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Body of the send-message endpoint.
///
/// The remote schema expects `receiverIds` as a JSON-encoded string, not a
/// native array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message: String,
    pub receiver_ids: String,
}

impl SendMessageRequest {
    pub fn new(message: impl Into<String>, receiver_ids: &[String]) -> Result<Self> {
        Ok(Self {
            message: message.into(),
            receiver_ids: serde_json::to_string(receiver_ids)?,
        })
    }
}
