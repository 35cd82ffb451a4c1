// Presentation surface: read-only snapshots over HTTP and WebSocket, plus command passthrough

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::engine::EngineHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) engine: EngineHandle,
}

pub fn app(engine: EngineHandle) -> Router {
    let state = AppState { engine };
    Router::new()
        .route("/", get(|| async { "idswatch dashboard core" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/snapshot", get(http::snapshot_handler)) // GET /api/snapshot
        .route("/api/capture/toggle", post(http::toggle_capture_handler)) // POST /api/capture/toggle
        .route("/api/simulator/toggle", post(http::toggle_simulator_handler)) // POST /api/simulator/toggle
        .route("/api/inject", post(http::inject_handler)) // POST /api/inject
        .route("/api/server/status", get(http::server_status_handler)) // GET /api/server/status
        .route("/api/server/alerts", get(http::recent_alerts_handler)) // GET /api/server/alerts
        .route("/api/demo_mode/toggle", post(http::toggle_demo_mode_handler)) // POST /api/demo_mode/toggle
        .route("/api/reconnect", post(http::reconnect_handler)) // POST /api/reconnect
        .route("/ws/dashboard", get(ws::ws_dashboard)) // WS /ws/dashboard
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
