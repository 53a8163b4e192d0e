use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{error, info};

use super::state::ApiState;
use crate::error::SessionError;
use crate::state::{AppEvent, ConnectionState};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub state: ConnectionState,
}

#[derive(Debug, Serialize)]
pub struct MicResponse {
    pub mic_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session/state
/// Current AppState snapshot (connection, history, timeline, current, mic)
pub async fn get_state(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.session.store().snapshot())
}

/// POST /session/connect
/// Acquire media and open the live session
pub async fn connect(State(state): State<ApiState>) -> impl IntoResponse {
    info!("connect requested");

    match state.session.connect().await {
        // connect() has already resolved by now; report where the session
        // actually landed so this can never disagree with /session/state.
        Ok(()) => (
            StatusCode::OK,
            Json(ConnectResponse {
                state: state.session.store().snapshot().connection,
            }),
        )
            .into_response(),

        Err(SessionError::MissingCredential) => (
            StatusCode::PRECONDITION_FAILED,
            Json(ErrorResponse {
                error: SessionError::MissingCredential.to_string(),
            }),
        )
            .into_response(),

        Err(e) => {
            error!("connect failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("connect failed: {e}"),
                }),
            )
                .into_response()
        }
    }
}

/// POST /session/disconnect
/// Stop producers and release everything. Idempotent.
pub async fn disconnect(State(state): State<ApiState>) -> impl IntoResponse {
    info!("disconnect requested");
    state.session.disconnect().await;

    (
        StatusCode::OK,
        Json(ActionResponse {
            status: "disconnected".to_string(),
        }),
    )
}

/// POST /session/mic/toggle
/// Flip microphone forwarding
pub async fn toggle_mic(State(state): State<ApiState>) -> impl IntoResponse {
    state.session.store().dispatch(AppEvent::ToggleMic);
    let mic_enabled = state.session.store().mic_enabled();
    info!(mic_enabled, "mic toggled");

    (StatusCode::OK, Json(MicResponse { mic_enabled }))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
