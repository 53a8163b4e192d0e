use std::collections::VecDeque;

use serde::Serialize;

use super::frame::{AnalysisFrame, EmotionPoint};

/// Most-recent-first analysis history kept for the log view.
pub const HISTORY_CAP: usize = 50;

/// Chronological chart points kept for the timeline view.
pub const TIMELINE_CAP: usize = 60;

/// Connection state of the live session. Exactly one instance process-wide,
/// held inside [`AppState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Aggregate dashboard state. Modified only through [`reduce`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    /// Live session connection state
    pub connection: ConnectionState,

    /// Received frames, most recent first, capped at [`HISTORY_CAP`]
    pub history: VecDeque<AnalysisFrame>,

    /// Timeline chart points, chronological, capped at [`TIMELINE_CAP`]
    pub timeline: VecDeque<EmotionPoint>,

    /// The most recently received frame, if any
    pub current: Option<AnalysisFrame>,

    /// Whether microphone audio is forwarded (user-toggled, defaults on)
    pub mic_enabled: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            history: VecDeque::with_capacity(HISTORY_CAP),
            timeline: VecDeque::with_capacity(TIMELINE_CAP),
            current: None,
            mic_enabled: true,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events the reducer understands.
#[derive(Debug, Clone)]
pub enum AppEvent {
    SetConnectionState(ConnectionState),
    AddFrame(AnalysisFrame),
    ToggleMic,
    Reset,
}

/// Pure state transition: same `(state, event)` always yields an equal state.
///
/// Only `AddFrame` touches the history buffers; eviction is strict FIFO
/// (oldest entry dropped first) once a cap is reached.
pub fn reduce(state: &AppState, event: AppEvent) -> AppState {
    match event {
        AppEvent::SetConnectionState(connection) => AppState {
            connection,
            ..state.clone()
        },

        AppEvent::AddFrame(frame) => {
            let mut next = state.clone();

            next.timeline.push_back(EmotionPoint::from_frame(&frame));
            if next.timeline.len() > TIMELINE_CAP {
                next.timeline.pop_front();
            }

            next.history.push_front(frame.clone());
            if next.history.len() > HISTORY_CAP {
                next.history.pop_back();
            }

            next.current = Some(frame);
            next
        }

        AppEvent::ToggleMic => AppState {
            mic_enabled: !state.mic_enabled,
            ..state.clone()
        },

        AppEvent::Reset => AppState::new(),
    }
}
