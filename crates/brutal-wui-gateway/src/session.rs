//! Session lifecycle and the per-session inbound event loop.
//!
//! Each session moves `Connecting -> Active -> Closed`. Registration and
//! the writer task are owned by a guard, so the session leaves the registry
//! exactly once on every exit path: remote close, transport error, shutdown,
//! or the session future being dropped. Shutdown also interrupts a callback
//! that is still running.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use chrono::Utc;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use brutal_wui_core::protocol::InboundEvent;

use crate::broadcast::Broadcaster;
use crate::handler::{run_contained, UiHandler};
use crate::metrics;
use crate::registry::{SessionHandle, SessionRegistry};

/// How long shutdown waits for the close frame to be written.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Active,
    Closed,
}

/// Why an inbound loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The browser sent a close frame.
    RemoteClosed,
    /// The transport stream ended without a close frame.
    StreamEnded,
    TransportError,
    /// Process shutdown. Normal termination, not an error.
    Cancelled,
}

/// Deregisters the session and stops its writer when dropped.
struct SessionGuard {
    registry: Arc<SessionRegistry>,
    id: String,
    writer: JoinHandle<()>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.writer.abort();
        if self.registry.remove(&self.id) {
            metrics::record_session_close();
        }
        debug!(session_id = %self.id, phase = ?SessionPhase::Closed, "Session deregistered");
    }
}

/// Runs one browser session from connect to teardown.
#[derive(Clone)]
pub struct SessionController {
    registry: Arc<SessionRegistry>,
    ui: Broadcaster,
    handler: Arc<dyn UiHandler>,
    shutdown: CancellationToken,
}

impl SessionController {
    pub fn new(
        registry: Arc<SessionRegistry>,
        handler: Arc<dyn UiHandler>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ui: Broadcaster::new(registry.clone()),
            registry,
            handler,
            shutdown,
        }
    }

    /// Drive an upgraded WebSocket until it closes.
    pub async fn run(self, socket: WebSocket) -> LoopExit {
        let (sink, stream) = socket.split();
        self.run_with(sink, stream).await
    }

    /// Drive a session over any message sink and stream.
    pub async fn run_with<W, R, E>(self, mut sink: W, stream: R) -> LoopExit
    where
        W: Sink<Message> + Unpin + Send + 'static,
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        let (handle, mut rx) = SessionHandle::channel();
        let id = handle.id.clone();
        let connected_at = handle.connected_at;
        debug!(session_id = %id, phase = ?SessionPhase::Connecting, "Session connecting");

        let close = CancellationToken::new();
        let writer = {
            let close = close.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = close.cancelled() => {
                            let frame = CloseFrame {
                                code: close_code::AWAY,
                                reason: "server shutting down".into(),
                            };
                            let _ = sink.send(Message::Close(Some(frame))).await;
                            break;
                        }
                        frame = rx.recv() => {
                            let Some(frame) = frame else { break };
                            if sink.send(Message::Text(frame.to_string().into())).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            })
        };

        self.registry.add(handle);
        metrics::record_session_open();
        let mut guard = SessionGuard {
            registry: self.registry.clone(),
            id: id.clone(),
            writer,
        };

        let cancel = self.shutdown.child_token();
        // An init failure is logged; the session stays usable.
        let init = run_contained("init", Some(id.as_str()), self.handler.on_init(&self.ui));
        let exit = match until_cancelled(&cancel, init).await {
            None => {
                info!(session_id = %id, "Init interrupted by shutdown");
                LoopExit::Cancelled
            }
            Some(_) => {
                info!(
                    session_id = %id,
                    phase = ?SessionPhase::Active,
                    sessions = self.registry.len(),
                    "Session active"
                );
                inbound_loop(&id, stream, self.handler.as_ref(), &self.ui, &cancel).await
            }
        };

        if exit == LoopExit::Cancelled {
            close.cancel();
            if tokio::time::timeout(CLOSE_GRACE, &mut guard.writer).await.is_err() {
                debug!(session_id = %id, "Close frame not flushed in time");
            }
        }

        drop(guard);
        let lifetime_ms = (Utc::now() - connected_at).num_milliseconds();
        info!(session_id = %id, ?exit, lifetime_ms, "Session closed");
        exit
    }
}

/// Await `fut` unless `cancel` fires first. Cancellation wins ties.
async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

/// Read frames one at a time, in arrival order, and hand each event to the
/// application. The callback is awaited before the next read, so it never
/// runs concurrently with itself for one session. Cancellation is observed
/// both while waiting for a frame and while a callback runs.
pub async fn inbound_loop<R, E>(
    session_id: &str,
    mut stream: R,
    handler: &dyn UiHandler,
    ui: &Broadcaster,
    cancel: &CancellationToken,
) -> LoopExit
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let Some(next) = until_cancelled(cancel, stream.next()).await else {
            return LoopExit::Cancelled;
        };

        let text = match next {
            None => return LoopExit::StreamEnded,
            Some(Err(e)) => {
                warn!(session_id, %e, "WebSocket error");
                return LoopExit::TransportError;
            }
            Some(Ok(Message::Close(_))) => {
                debug!(session_id, "Client requested close");
                return LoopExit::RemoteClosed;
            }
            Some(Ok(Message::Text(text))) => text.to_string(),
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(e) => {
                    warn!(session_id, %e, "Dropping non-UTF-8 binary frame");
                    continue;
                }
            },
            // Axum answers pings itself.
            Some(Ok(_)) => continue,
        };

        if until_cancelled(cancel, dispatch_frame(session_id, &text, handler, ui))
            .await
            .is_none()
        {
            info!(session_id, "Event callback interrupted by shutdown");
            return LoopExit::Cancelled;
        }
    }
}

async fn dispatch_frame(session_id: &str, text: &str, handler: &dyn UiHandler, ui: &Broadcaster) {
    let event = match InboundEvent::decode(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(session_id, %e, "Dropping malformed frame");
            return;
        }
    };

    metrics::record_inbound_event();
    debug!(session_id, event = %event.event, "Inbound event");
    run_contained(
        "event",
        Some(session_id),
        handler.on_event(ui, &event.event, event.data),
    )
    .await;
}
