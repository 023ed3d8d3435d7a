//! Chat threads and messages.

pub mod chat;
pub mod model;

pub use chat::{ChatState, merge_messages};
pub use model::{
    Message, MessagePhoto, SendMessageRequest, Thread, ThreadList, ThreadMessages,
    ThreadParticipant,
};
