//! Session domain: credentials held by the client and their durable records.

pub mod model;
pub mod repository;

pub use model::{AuthStatus, AuthUser, Session, StoredDeviceId, StoredToken};
pub use repository::{CredentialRepository, InMemoryCredentialRepository};
