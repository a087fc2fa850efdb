//! Application callbacks.
//!
//! Every callback failure, whether an `Err` or a panic, is contained:
//! it is logged and the caller carries on with the next message or tick.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::error;

use crate::broadcast::Broadcaster;
use crate::metrics;

/// Bytes and content type for a developer asset served at `/assets/{name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Asset {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// Read a file, guessing its content type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        Ok(Self::new(bytes, mime.as_ref()))
    }
}

/// Callbacks driven by browser sessions. All methods default to no-ops.
#[async_trait]
pub trait UiHandler: Send + Sync {
    /// Called once per session, right after it is registered.
    async fn on_init(&self, _ui: &Broadcaster) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called for every event a page sends with `_wuiEvent(name, data)`.
    ///
    /// Never invoked concurrently for the same session.
    async fn on_event(
        &self,
        _ui: &Broadcaster,
        _event: &str,
        _data: serde_json::Value,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Resolve `/assets/{name}`. `None` answers 404.
    async fn on_asset(&self, _name: &str) -> Option<Asset> {
        None
    }
}

/// Handler that ignores everything.
pub struct NoopHandler;

impl UiHandler for NoopHandler {}

/// Periodic process-wide callback.
#[async_trait]
pub trait BackgroundTask: Send + Sync {
    async fn tick(&self, ui: &Broadcaster) -> anyhow::Result<()>;
}

struct FnTask<F>(F);

#[async_trait]
impl<F, Fut> BackgroundTask for FnTask<F>
where
    F: Fn(Broadcaster) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn tick(&self, ui: &Broadcaster) -> anyhow::Result<()> {
        (self.0)(ui.clone()).await
    }
}

/// Wrap an async closure as a [`BackgroundTask`].
pub fn background_fn<F, Fut>(f: F) -> Arc<dyn BackgroundTask>
where
    F: Fn(Broadcaster) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnTask(f))
}

/// Await a callback, logging an error or panic instead of propagating it.
/// Returns whether the callback succeeded.
pub(crate) async fn run_contained<F>(callback: &'static str, session_id: Option<&str>, fut: F) -> bool
where
    F: Future<Output = anyhow::Result<()>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(callback, session_id, error = %e, "Callback failed");
            metrics::record_callback_error(callback);
            false
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(callback, session_id, %message, "Callback panicked");
            metrics::record_callback_error(callback);
            false
        }
    }
}
