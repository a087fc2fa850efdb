//! Realtime synchronization layer for BrutalWUI.
//!
//! The gateway hosts the WebSocket endpoint, tracks every live browser
//! session, broadcasts DOM commands to all of them, dispatches browser events
//! to the application, and drives the optional background loop.

pub mod background;
pub mod broadcast;
pub mod handler;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod session;
pub mod state;

pub use broadcast::Broadcaster;
pub use handler::{background_fn, Asset, BackgroundTask, NoopHandler, UiHandler};
pub use registry::{SendFailure, SessionHandle, SessionRegistry, OUTBOUND_QUEUE_CAPACITY};
pub use server::{build_router, WebUi};
pub use session::{LoopExit, SessionController};
pub use state::WuiState;
