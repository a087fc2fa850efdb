//! Connection registry: the set of currently attached browser sessions.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Frames queued per session before further sends are dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1024;

/// Outbound half of one live session.
///
/// Frames are pushed onto a bounded channel drained by the session's writer
/// task. Sending never waits: a full queue drops the frame.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: String,
    pub connected_at: DateTime<Utc>,
    tx: mpsc::Sender<Arc<str>>,
}

/// Why a frame was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// The browser is not keeping up; its queue is at capacity.
    QueueFull,
    /// The session's writer task is gone.
    Closed,
}

impl SessionHandle {
    pub fn new(tx: mpsc::Sender<Arc<str>>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            connected_at: Utc::now(),
            tx,
        }
    }

    /// A handle plus the receiving end of its queue, sized
    /// [`OUTBOUND_QUEUE_CAPACITY`].
    pub fn channel() -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        (Self::new(tx), rx)
    }

    /// Queue a text frame for this session.
    pub fn send(&self, frame: Arc<str>) -> Result<(), SendFailure> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendFailure::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendFailure::Closed,
        })
    }
}

/// In-memory set of sessions keyed by id.
///
/// Mutation and snapshot are each atomic. The lock is never held across an
/// await point, which also lets teardown remove a session from `Drop`.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. Returns `false` if the id was already present.
    pub fn add(&self, handle: SessionHandle) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.contains_key(&handle.id) {
            return false;
        }
        sessions.insert(handle.id.clone(), handle);
        true
    }

    /// Remove a session. Returns `false` if it was not registered.
    pub fn remove(&self, id: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// Copy of the current membership, in no particular order.
    pub fn snapshot(&self) -> Vec<SessionHandle> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
