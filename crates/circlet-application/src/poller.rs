//! Cancellable periodic tasks.

use circlet_core::Result;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

pub struct Poller;

impl Poller {
    /// Runs `tick` every `period` until the returned handle is stopped or
    /// dropped. The first tick fires immediately. A failed tick is logged and
    /// the loop continues.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(name: impl Into<String>, period: Duration, mut tick: F) -> PollHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let token = CancellationToken::new();
        let child = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::debug!("[Poller] {} started ({:?} period)", name, period);

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = tick().await {
                            tracing::warn!("[Poller] {} tick failed: {}", name, e);
                        }
                    }
                }
            }

            tracing::debug!("[Poller] {} stopped", name);
        });

        PollHandle {
            token,
            handle: Some(handle),
        }
    }
}

/// Owner of a running poll loop. Dropping it stops the loop.
pub struct PollHandle {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the loop to exit. Does not stop it.
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("[Poller] Task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
