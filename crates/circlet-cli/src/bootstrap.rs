use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use circlet_application::{Bridge, CommandDispatcher, SessionStore};
use circlet_core::clock::SystemClock;
use circlet_core::config::AppConfig;
use circlet_core::session::AuthStatus;
use circlet_infrastructure::{CircletPaths, ConfigService, FileCredentialRepository};
use circlet_interaction::ReqwestGateway;
use tracing_appender::non_blocking::WorkerGuard;

use crate::logging;

pub struct AppBootstrap {
    pub bridge: Bridge,
    pub dispatcher: Arc<CommandDispatcher>,
    pub repository: Arc<FileCredentialRepository>,
    pub paths: CircletPaths,
    pub config: AppConfig,
    _log_guard: Option<WorkerGuard>,
}

impl AppBootstrap {
    /// Loads configuration, installs logging and wires the dispatcher.
    /// Performs no network I/O.
    pub async fn init(base_dir: Option<&Path>) -> Result<Self> {
        let paths = CircletPaths::new(base_dir);
        let config = ConfigService::new(&paths)
            .and_then(|service| service.load())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;
        let paths = ConfigService::resolve_paths(paths, &config);

        let logs_dir = paths.logs_dir().ok();
        let log_guard = logging::init(&config.log.level, logs_dir.as_deref())?;

        let repository = Arc::new(FileCredentialRepository::new(&paths)?);
        let store = Arc::new(SessionStore::new(repository.clone(), Arc::new(SystemClock)));
        let gateway = Arc::new(ReqwestGateway::from_config(&config.api)?);
        let dispatcher = Arc::new(CommandDispatcher::new(store, gateway, &config.api));

        tracing::debug!(
            "[Bootstrap] API base {}, location endpoint {}",
            config.api.base_url,
            config.api.location_url
        );

        Ok(Self {
            bridge: Bridge::new(dispatcher.clone()),
            dispatcher,
            repository,
            paths,
            config,
            _log_guard: log_guard,
        })
    }

    /// Restores the stored session and verifies it against the service.
    pub async fn restore(&self) -> AuthStatus {
        let status = self.dispatcher.check_auth_status().await;
        match &status.user {
            Some(user) => tracing::info!("[Bootstrap] Restored session for user {}", user.id),
            None => tracing::info!("[Bootstrap] No valid session; run `circlet login`"),
        }
        status
    }
}
