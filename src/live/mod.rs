//! Remote live-session collaborator.
//!
//! The session core talks to the remote analysis service only through the
//! [`LiveConnector`]/[`LiveSession`] traits; [`client`] implements them over
//! the Gemini Live websocket protocol, tests substitute mocks.

pub mod client;
pub mod messages;

use anyhow::Result;
use tokio::sync::mpsc;

pub use client::GeminiLiveConnector;
pub use messages::{ANALYSIS_TOOL, DEFAULT_ENDPOINT, DEFAULT_MODEL};

/// One tool invocation from the remote model. Must be acknowledged by id to
/// keep the remote tool-call protocol from stalling.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: serde_json::Value,
}

/// Events surfaced by an open live session, in arrival order.
#[derive(Debug)]
pub enum LiveEvent {
    ToolCall(ToolCall),
    Closed,
    Error(String),
}

/// Connection parameters for a live session.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
}

/// An open bidirectional session: the outbound half plus the event stream.
pub struct LiveHandle {
    pub session: Box<dyn LiveSession>,
    pub events: mpsc::Receiver<LiveEvent>,
}

/// Outbound half of an open live session.
///
/// Sends are fire-and-forget from the caller's perspective; an error return
/// means this one message failed, not that the session is gone (session death
/// arrives as a [`LiveEvent`]).
#[async_trait::async_trait]
pub trait LiveSession: Send + Sync {
    /// Send one base64-encoded PCM16 audio chunk.
    async fn send_audio(&mut self, base64_pcm: &str, sample_rate: u32) -> Result<()>;

    /// Send one JPEG video frame.
    async fn send_frame(&mut self, jpeg: &[u8]) -> Result<()>;

    /// Send a user text turn (used for the kickoff message).
    async fn send_text(&mut self, text: &str) -> Result<()>;

    /// Acknowledge a tool call with the fixed "ok" result.
    async fn send_tool_ok(&mut self, call_id: &str, name: &str) -> Result<()>;

    /// Close the session. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// Opens live sessions.
#[async_trait::async_trait]
pub trait LiveConnector: Send + Sync {
    async fn connect(&self, config: &LiveConfig) -> Result<LiveHandle>;
}
