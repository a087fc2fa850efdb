//! HTTP/WebSocket server and the application-facing `WebUi` builder.

use std::sync::Arc;

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use brutal_wui_core::config::Config;

use crate::background::spawn_background_loop;
use crate::broadcast::Broadcaster;
use crate::handler::{BackgroundTask, NoopHandler, UiHandler};
use crate::registry::SessionRegistry;
use crate::state::WuiState;

/// A BrutalWUI application server.
///
/// ```no_run
/// # async fn demo() -> anyhow::Result<()> {
/// use brutal_wui_core::config::Config;
/// use brutal_wui_gateway::{background_fn, WebUi};
///
/// let ui = WebUi::new(Config::default()).with_background_task(background_fn(|ui| async move {
///     ui.el_set_text(&["#clock"], chrono::Utc::now().to_rfc3339());
///     Ok(())
/// }));
/// ui.run().await
/// # }
/// ```
pub struct WebUi {
    config: Arc<Config>,
    registry: Arc<SessionRegistry>,
    handler: Arc<dyn UiHandler>,
    background: Option<Arc<dyn BackgroundTask>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    #[cfg(feature = "metrics")]
    metrics: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl WebUi {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(SessionRegistry::new()),
            handler: Arc::new(NoopHandler),
            background: None,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    pub fn with_handler(self, handler: impl UiHandler + 'static) -> Self {
        self.with_shared_handler(Arc::new(handler))
    }

    pub fn with_shared_handler(mut self, handler: Arc<dyn UiHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Run `task` every `background.interval_ms` while the server is up.
    pub fn with_background(self, task: impl BackgroundTask + 'static) -> Self {
        self.with_background_task(Arc::new(task))
    }

    pub fn with_background_task(mut self, task: Arc<dyn BackgroundTask>) -> Self {
        self.background = Some(task);
        self
    }

    /// Serve the recorder's output at `/metrics`.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, handle: metrics_exporter_prometheus::PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Broadcast handle usable from anywhere, including outside callbacks.
    pub fn broadcaster(&self) -> Broadcaster {
        Broadcaster::new(self.registry.clone())
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Cancelling this token stops the server. Cancelling twice is harmless.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Build the full route table without binding a socket.
    pub fn router(&self) -> Router {
        build_router(Arc::new(self.state()))
    }

    fn state(&self) -> WuiState {
        #[allow(unused_mut)]
        let mut state = WuiState::new(
            self.config.clone(),
            self.registry.clone(),
            self.handler.clone(),
            self.shutdown.clone(),
            self.tracker.clone(),
        );
        #[cfg(feature = "metrics")]
        {
            state.metrics = self.metrics.clone();
        }
        state
    }

    /// Bind `server.host:server.port` and serve until Ctrl+C or the
    /// shutdown token fires.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr).await?;

        let token = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_signal() => token.cancel(),
                _ = token.cancelled() => {}
            }
        });

        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    ///
    /// Returns after shutdown, once every session has been torn down and
    /// the background loop has stopped.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        let state = Arc::new(self.state());
        let app = build_router(state.clone());

        let background = self.background.map(|task| {
            spawn_background_loop(
                task,
                state.broadcaster.clone(),
                state.config.background_interval(),
                state.shutdown.clone(),
            )
        });

        info!("BrutalWUI listening on http://{addr}/");

        let shutdown = state.shutdown.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;

        state.shutdown.cancel();
        state.tracker.close();
        state.tracker.wait().await;
        if let Some(handle) = background {
            if let Err(e) = handle.await {
                error!(%e, "Background loop task failed");
            }
        }
        info!(sessions = state.registry.len(), "BrutalWUI stopped");

        result?;
        Ok(())
    }
}

/// Route table: `/wui`, `/assets/{name}`, `/health`, optionally `/metrics`,
/// plus the page routes from `brutal_wui_web`.
pub fn build_router(state: Arc<WuiState>) -> Router {
    let page = state.config.page.clone();
    let debug = state.config.debug;

    let app = Router::new()
        .route("/wui", get(ws_handler))
        .route("/assets/{name}", get(asset_handler))
        .route("/health", get(health_handler));
    #[cfg(feature = "metrics")]
    let app = app.route("/metrics", get(metrics_handler));

    app.with_state(state)
        .merge(brutal_wui_web::ui_router(page, debug))
        .layer(TraceLayer::new_for_http())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WuiState>>) -> Response {
    if state.shutdown.is_cancelled() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let controller = state.controller();
    // Held for the session's lifetime so shutdown waits for its teardown.
    let token = state.tracker.token();
    ws.on_upgrade(move |socket| async move {
        let _token = token;
        controller.run(socket).await;
    })
}

async fn asset_handler(Path(name): Path<String>, State(state): State<Arc<WuiState>>) -> Response {
    match state.handler.on_asset(&name).await {
        Some(asset) => {
            debug!(%name, bytes = asset.bytes.len(), "Serving asset");
            ([(header::CONTENT_TYPE, asset.content_type)], asset.bytes).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn health_handler(State(state): State<Arc<WuiState>>) -> impl IntoResponse {
    axum::Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.registry.len(),
    }))
}

#[cfg(feature = "metrics")]
async fn metrics_handler(State(state): State<Arc<WuiState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(%e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
