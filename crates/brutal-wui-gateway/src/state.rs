//! Shared server state.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use brutal_wui_core::config::Config;

use crate::broadcast::Broadcaster;
use crate::handler::UiHandler;
use crate::registry::SessionRegistry;
use crate::session::SessionController;

/// State shared by every route and session task.
pub struct WuiState {
    pub config: Arc<Config>,
    pub registry: Arc<SessionRegistry>,
    pub broadcaster: Broadcaster,
    pub handler: Arc<dyn UiHandler>,
    /// Cancelled once on shutdown; every session loop watches a child of it.
    pub shutdown: CancellationToken,
    /// Tracks session tasks so shutdown can wait for their teardown.
    pub tracker: TaskTracker,
    #[cfg(feature = "metrics")]
    pub metrics: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl WuiState {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<SessionRegistry>,
        handler: Arc<dyn UiHandler>,
        shutdown: CancellationToken,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            config,
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
            handler,
            shutdown,
            tracker,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Controller for one new session.
    pub fn controller(&self) -> SessionController {
        SessionController::new(self.registry.clone(), self.handler.clone(), self.shutdown.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NoopHandler;

    #[test]
    fn test_broadcaster_shares_registry() {
        let state = WuiState::new(
            Arc::new(Config::default()),
            Arc::new(SessionRegistry::new()),
            Arc::new(NoopHandler),
            CancellationToken::new(),
            TaskTracker::new(),
        );
        let (handle, _rx) = crate::registry::SessionHandle::channel();
        state.registry.add(handle);
        assert_eq!(state.broadcaster.session_count(), 1);
    }
}
