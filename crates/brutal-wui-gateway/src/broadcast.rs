//! Command broadcasting to every connected browser session.
//!
//! Delivery is at-most-once and unacknowledged: [`Broadcaster::broadcast`]
//! returns nothing, and a session that cannot take the frame is skipped.
//! That covers a session whose writer is gone and one whose bounded queue
//! is full because the browser stopped reading. Removing a dead session is
//! left to its lifecycle task, which sees the transport close.

use std::sync::Arc;

use tracing::{debug, error, warn};

use brutal_wui_core::protocol::Command;

use crate::metrics;
use crate::registry::{SendFailure, SessionRegistry};

/// Handle used by application callbacks to update every connected page.
///
/// Cheap to clone; all clones share the same registry.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<SessionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Send `command` to every session registered at call time.
    pub fn broadcast(&self, command: &Command) {
        let kind = command.kind();
        let frame: Arc<str> = match command.to_frame() {
            Ok(f) => f.into(),
            Err(e) => {
                error!(kind, %e, "Failed to serialize command");
                return;
            }
        };

        let recipients = self.registry.snapshot();
        let mut delivered = 0usize;
        for session in &recipients {
            match session.send(Arc::clone(&frame)) {
                Ok(()) => delivered += 1,
                Err(SendFailure::QueueFull) => {
                    warn!(session_id = %session.id, kind, "Outbound queue full, command dropped");
                    metrics::record_send_failure();
                }
                Err(SendFailure::Closed) => {
                    debug!(session_id = %session.id, kind, "Session unreachable, command dropped");
                    metrics::record_send_failure();
                }
            }
        }
        metrics::record_broadcast(kind);
        debug!(kind, recipients = recipients.len(), delivered, "Broadcast command");
    }

    /// Number of sessions currently registered.
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    pub fn pg_set_title(&self, content: impl Into<String>) {
        self.broadcast(&Command::set_title(content));
    }

    pub fn pg_eval(&self, script: impl Into<String>) {
        self.broadcast(&Command::eval(script));
    }

    /// Set `innerHTML`. The markup is not sanitized.
    pub fn el_set_html<S: AsRef<str>>(&self, selectors: &[S], content: impl Into<String>) {
        self.broadcast(&Command::html(selectors, content));
    }

    pub fn el_set_text<S: AsRef<str>>(&self, selectors: &[S], content: impl Into<String>) {
        self.broadcast(&Command::text(selectors, content));
    }

    pub fn el_append_text<S: AsRef<str>>(&self, selectors: &[S], content: impl Into<String>) {
        self.broadcast(&Command::text_append(selectors, content));
    }

    pub fn el_set_value<S: AsRef<str>>(&self, selectors: &[S], content: impl Into<String>) {
        self.broadcast(&Command::value(selectors, content));
    }

    pub fn el_append_value<S: AsRef<str>>(&self, selectors: &[S], content: impl Into<String>) {
        self.broadcast(&Command::value_append(selectors, content));
    }

    pub fn el_set_attribute<S: AsRef<str>>(
        &self,
        selectors: &[S],
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.broadcast(&Command::set_attr(selectors, name, value));
    }

    /// Set an inline style property; `name` is the camelCase property.
    pub fn el_set_style<S: AsRef<str>>(
        &self,
        selectors: &[S],
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.broadcast(&Command::set_style(selectors, name, value));
    }

    pub fn el_class_add<S: AsRef<str>>(&self, selectors: &[S], class: impl Into<String>) {
        self.broadcast(&Command::class_add(selectors, class));
    }

    pub fn el_class_remove<S: AsRef<str>>(&self, selectors: &[S], class: impl Into<String>) {
        self.broadcast(&Command::class_remove(selectors, class));
    }

    pub fn el_disable<S: AsRef<str>>(&self, selectors: &[S]) {
        self.broadcast(&Command::disable(selectors));
    }

    pub fn el_enable<S: AsRef<str>>(&self, selectors: &[S]) {
        self.broadcast(&Command::enable(selectors));
    }
}
