//! HTTP facade consumed by the dashboard UI
//!
//! This module exposes the AppState snapshot and the dispatchable user
//! actions over REST:
//! - GET /session/state - Current state snapshot
//! - POST /session/connect - Start a session
//! - POST /session/disconnect - Stop the session
//! - POST /session/mic/toggle - Flip microphone forwarding
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::ApiState;
