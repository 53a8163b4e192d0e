use std::time::Duration;

use crate::live::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::media::FrameCaptureConfig;

/// Configuration for an analysis session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier (e.g. "live-<uuid>")
    pub session_id: String,

    /// Live service websocket endpoint
    pub endpoint: String,

    /// Model the live session is opened against
    pub model: String,

    /// API credential. `connect()` refuses to start without one.
    pub api_key: Option<String>,

    /// Bounds applied to every transmitted video frame
    pub frame: FrameCaptureConfig,

    /// Frame sampling period. 500ms is a deliberate 2 Hz cap to bound
    /// bandwidth and cost.
    pub frame_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("live-{}", uuid::Uuid::new_v4()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            frame: FrameCaptureConfig::default(),
            frame_interval: Duration::from_millis(500),
        }
    }
}
