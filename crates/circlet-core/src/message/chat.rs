//! Client-side view of the selected chat thread.
//!
//! The server only returns a bounded window of recent messages, so fetched
//! pages are merged into what the view already holds. Completeness of
//! history is not guaranteed.

use std::collections::HashSet;

use crate::error::{CircletError, Result};
use crate::message::model::{Message, Thread};

/// Merges `fetched` into `existing`, keeping the first copy of each id and
/// ordering by timestamp ascending. Equal timestamps keep arrival order.
pub fn merge_messages(existing: Vec<Message>, fetched: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Message> = existing
        .into_iter()
        .chain(fetched)
        .filter(|m| seen.insert(m.id.clone()))
        .collect();
    merged.sort_by_key(|m| m.timestamp);
    merged
}

/// Selected circle/thread and the messages shown for it.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    circle_id: Option<String>,
    thread: Option<Thread>,
    messages: Vec<Message>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn circle_id(&self) -> Option<&str> {
        self.circle_id.as_deref()
    }

    pub fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Selects a thread within a circle, discarding messages of any other
    /// selection.
    pub fn select_thread(&mut self, circle_id: impl Into<String>, thread: Thread) {
        let circle_id = circle_id.into();
        let same = self.circle_id.as_deref() == Some(circle_id.as_str())
            && self.thread.as_ref().map(|t| t.id.as_str()) == Some(thread.id.as_str());
        if !same {
            self.messages.clear();
        }
        self.circle_id = Some(circle_id);
        self.thread = Some(thread);
    }

    /// Drops the selection, e.g. when the current circle changes.
    pub fn clear(&mut self) {
        self.circle_id = None;
        self.thread = None;
        self.messages.clear();
    }

    /// Whether a response tagged with `circle_id`/`thread_id` still targets
    /// the current selection.
    pub fn is_current(&self, circle_id: &str, thread_id: &str) -> bool {
        self.circle_id.as_deref() == Some(circle_id)
            && self.thread.as_ref().is_some_and(|t| t.id == thread_id)
    }

    /// Merges a fetched page. Returns `false` and changes nothing if the page
    /// belongs to a selection that is no longer current.
    pub fn apply_fetch(&mut self, circle_id: &str, thread_id: &str, fetched: Vec<Message>) -> bool {
        if !self.is_current(circle_id, thread_id) {
            return false;
        }
        let existing = std::mem::take(&mut self.messages);
        self.messages = merge_messages(existing, fetched);
        true
    }

    /// Recipients for a new message in the selected thread.
    pub fn receiver_ids(&self, current_user_id: &str) -> Result<Vec<String>> {
        let thread = self
            .thread
            .as_ref()
            .ok_or_else(|| CircletError::precondition("no chat thread selected"))?;
        Ok(thread.receiver_ids(current_user_id))
    }
}
