//! Analysis session management
//!
//! This module provides the `AnalysisSession` abstraction that manages:
//! - Media device acquisition (camera + microphone)
//! - The remote live session (open, tool calls, close)
//! - Audio forwarding and periodic frame sampling
//! - Idempotent teardown on disconnect, remote close, or error

mod config;
mod session;

pub use config::SessionConfig;
pub use session::AnalysisSession;
