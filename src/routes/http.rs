// HTTP handlers: version, snapshot, commands

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::commands::CommandError;
use crate::models::InjectRequest;
use crate::version::{NAME, VERSION};

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        let status = match &self {
            CommandError::NotConnected | CommandError::EngineStopped => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CommandError::Transport(_) | CommandError::Rejected(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/snapshot: full dashboard state.
pub(super) async fn snapshot_handler(State(state): State<AppState>) -> Response {
    match state.engine.snapshot().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/capture/toggle: returns the confirmed toggles.
pub(super) async fn toggle_capture_handler(State(state): State<AppState>) -> Response {
    match state.engine.toggle_capture().await {
        Ok(toggles) => Json(toggles).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/simulator/toggle
pub(super) async fn toggle_simulator_handler(State(state): State<AppState>) -> Response {
    match state.engine.toggle_simulator().await {
        Ok(toggles) => Json(toggles).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/inject {"attack_type": "..."}
pub(super) async fn inject_handler(
    State(state): State<AppState>,
    Json(body): Json<InjectRequest>,
) -> Response {
    match state.engine.inject_attack(body.attack_type).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/server/status: the control endpoint's own view.
pub(super) async fn server_status_handler(State(state): State<AppState>) -> Response {
    match state.engine.server_status().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/server/alerts: alert history as the server holds it.
pub(super) async fn recent_alerts_handler(State(state): State<AppState>) -> Response {
    match state.engine.recent_alerts().await {
        Ok(alerts) => Json(alerts).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/demo_mode/toggle
pub(super) async fn toggle_demo_mode_handler(State(state): State<AppState>) -> Response {
    match state.engine.toggle_demo_mode().await {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/reconnect: 202 if a new connection manager was started, 409 if one is running.
pub(super) async fn reconnect_handler(State(state): State<AppState>) -> Response {
    match state.engine.reconnect().await {
        Ok(true) => StatusCode::ACCEPTED.into_response(),
        Ok(false) => StatusCode::CONFLICT.into_response(),
        Err(e) => e.into_response(),
    }
}
