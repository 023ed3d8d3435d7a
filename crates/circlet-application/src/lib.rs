//! Session orchestration: the session store, the command dispatcher and the
//! UI bridge in front of it.

pub mod bridge;
pub mod dispatcher;
pub mod poller;
pub mod session_store;

pub use bridge::{Bridge, BridgeEvent, BridgeNotification, BridgeRequest};
pub use dispatcher::{CommandDispatcher, DeviceResolution};
pub use poller::{PollHandle, Poller};
pub use session_store::{CredentialSnapshot, SessionStore};
