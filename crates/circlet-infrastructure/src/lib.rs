pub mod config_service;
pub mod credential_repository;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::credential_repository::FileCredentialRepository;
pub use crate::paths::CircletPaths;
