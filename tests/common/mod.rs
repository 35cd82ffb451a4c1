// Shared test helpers: payload builders, engine setup and an in-process mock control endpoint

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use idswatch::commands::CommandClient;
use idswatch::connection::{ConnectionConfig, TransportKind};
use idswatch::engine::{self, EngineConfig, EngineDeps, EngineHandle};
use idswatch::models::*;
use idswatch::state::BufferLimits;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, oneshot};
use tokio::time::Duration;

/// Nothing listens on port 1; connects fail immediately.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

pub fn packet(n: u64) -> PacketCaptured {
    PacketCaptured {
        timestamp: format!("2026-10-18T12:00:{:02}", n % 60),
        src_ip: format!("10.0.0.{}", n % 255),
        dst_ip: "192.168.1.10".into(),
        protocol: "TCP".into(),
        size: n,
    }
}

pub fn flow(packets: u64, confidence: f64, is_attack: bool) -> FlowAnalyzed {
    FlowAnalyzed {
        packets,
        confidence,
        is_attack,
        attack_type: if is_attack { "DDoS" } else { "BENIGN" }.into(),
        ..Default::default()
    }
}

pub fn alert(id: u64, severity: &str, confidence: f64) -> AlertRaised {
    AlertRaised {
        id,
        timestamp: "2026-10-18T12:00:00".into(),
        severity: severity.into(),
        attack_type: "PortScan".into(),
        src_ip: "198.51.100.7".into(),
        dst_ip: "192.168.1.20".into(),
        confidence,
        flow_id: format!("flow-{id}"),
        simulated: true,
    }
}

/// Socket.IO event packet, `42["event",{...}]`.
pub fn envelope(event: &str, data: impl serde::Serialize) -> String {
    format!("42{}", json!([event, data]))
}

pub fn connection_config(base_url: &str) -> ConnectionConfig {
    ConnectionConfig {
        base_url: base_url.to_string(),
        transports: vec![TransportKind::WebSocket, TransportKind::Polling],
        reconnect_attempts: 10,
        reconnect_delay: Duration::from_millis(20),
        path: "/socket.io/".into(),
        connect_timeout: Duration::from_secs(2),
    }
}

pub fn engine_config(base_url: &str) -> EngineConfig {
    EngineConfig {
        limits: BufferLimits::default(),
        accuracy: 98.45,
        sample_interval_ms: 1000,
        snapshot_interval_ms: 50,
        stats_log_interval_secs: 3600,
        interface: "eth-test".into(),
        simulator_interval_secs: 15,
        connection: connection_config(base_url),
    }
}

pub struct TestEngine {
    pub handle: EngineHandle,
    pub task: tokio::task::JoinHandle<()>,
    pub shutdown_tx: oneshot::Sender<()>,
}

pub fn start_engine(config: EngineConfig) -> TestEngine {
    let http = CommandClient::http_client(Duration::from_secs(2)).unwrap();
    let commands = CommandClient::new(http, &config.connection.base_url);
    let (snapshot_tx, _) = broadcast::channel(16);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let (handle, task) = engine::spawn(
        EngineDeps {
            commands,
            snapshot_tx,
            shutdown_rx,
        },
        config,
    );
    TestEngine {
        handle,
        task,
        shutdown_tx,
    }
}

/// Poll snapshots until `pred` holds (5 s limit).
pub async fn wait_for(
    engine: &EngineHandle,
    pred: impl Fn(&DashboardSnapshot) -> bool,
) -> DashboardSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = engine.snapshot().await.unwrap();
        if pred(&snapshot) {
            return snapshot;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for snapshot condition; last: {snapshot:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[derive(Clone, Copy)]
pub struct MockOptions {
    pub websocket: bool,
    pub polling: bool,
}

/// Heartbeat timing the mock advertises in its open packet.
const PING_INTERVAL_MS: u64 = 100;
const PING_TIMEOUT_MS: u64 = 1000;

#[derive(Clone)]
struct MockState {
    websocket: Arc<AtomicBool>,
    polling: Arc<AtomicBool>,
    frames_tx: broadcast::Sender<String>,
    kick_tx: broadcast::Sender<()>,
    /// Outgoing packets per polling session id.
    poll_sessions: Arc<Mutex<HashMap<String, Vec<String>>>>,
    next_sid: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<(String, Value)>>>,
    responses: Arc<Mutex<HashMap<String, (StatusCode, String)>>>,
    ws_clients: Arc<AtomicUsize>,
}

impl MockState {
    fn new_sid(&self) -> String {
        format!("mock-{}", self.next_sid.fetch_add(1, Ordering::SeqCst))
    }
}

/// In-process stand-in for the control endpoint: Engine.IO v4 at `/socket.io/` plus the
/// command API.
pub struct MockControl {
    pub base_url: String,
    state: MockState,
}

impl MockControl {
    /// Deliver one raw Engine.IO packet to every open session.
    pub fn push(&self, frame: String) {
        for queue in self.state.poll_sessions.lock().unwrap().values_mut() {
            queue.push(frame.clone());
        }
        let _ = self.state.frames_tx.send(frame);
    }

    /// Override the response for one command endpoint.
    pub fn respond(&self, endpoint: &str, status: StatusCode, body: &str) {
        self.state
            .responses
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), (status, body.to_string()));
    }

    /// Commands received so far, as (endpoint, body).
    pub fn commands(&self) -> Vec<(String, Value)> {
        self.state.commands.lock().unwrap().clone()
    }

    pub fn ws_clients(&self) -> usize {
        self.state.ws_clients.load(Ordering::SeqCst)
    }

    /// Switch transports on or off for new sessions.
    pub fn set_available(&self, websocket: bool, polling: bool) {
        self.state.websocket.store(websocket, Ordering::SeqCst);
        self.state.polling.store(polling, Ordering::SeqCst);
    }

    /// Close every open session from the server side.
    pub fn drop_sessions(&self) {
        let _ = self.state.kick_tx.send(());
        self.state.poll_sessions.lock().unwrap().clear();
    }
}

fn open_packet(sid: &str, ping_interval: u64, ping_timeout: u64) -> String {
    format!(
        "0{}",
        json!({
            "sid": sid,
            "upgrades": [],
            "pingInterval": ping_interval,
            "pingTimeout": ping_timeout,
            "maxPayload": 1_000_000
        })
    )
}

fn namespace_ack(sid: &str) -> String {
    format!("40{}", json!({ "sid": sid }))
}

pub async fn spawn_mock(opts: MockOptions) -> MockControl {
    let (frames_tx, _) = broadcast::channel(256);
    let (kick_tx, _) = broadcast::channel(4);
    let state = MockState {
        websocket: Arc::new(AtomicBool::new(opts.websocket)),
        polling: Arc::new(AtomicBool::new(opts.polling)),
        frames_tx,
        kick_tx,
        poll_sessions: Arc::new(Mutex::new(HashMap::new())),
        next_sid: Arc::new(AtomicUsize::new(1)),
        commands: Arc::new(Mutex::new(Vec::new())),
        responses: Arc::new(Mutex::new(HashMap::new())),
        ws_clients: Arc::new(AtomicUsize::new(0)),
    };

    let router = Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/alerts", get(alerts_handler))
        .route("/api/{endpoint}", post(command_handler))
        .route("/socket.io/", get(engineio_get).post(engineio_post))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockControl {
        base_url: format!("http://{addr}"),
        state,
    }
}

async fn engineio_get(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if query.get("EIO").map(String::as_str) != Some("4") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    match query.get("transport").map(String::as_str) {
        Some("websocket") if state.websocket.load(Ordering::SeqCst) => match ws {
            Ok(ws) => {
                // Subscribe before the upgrade completes so nothing pushed after the
                // namespace ack is missed.
                let rx = state.frames_tx.subscribe();
                let kick = state.kick_tx.subscribe();
                let sid = state.new_sid();
                let clients = state.ws_clients.clone();
                ws.on_upgrade(move |socket| serve_websocket(socket, sid, rx, kick, clients))
                    .into_response()
            }
            Err(rejection) => rejection.into_response(),
        },
        Some("polling") if state.polling.load(Ordering::SeqCst) => match query.get("sid") {
            None => {
                let sid = state.new_sid();
                state
                    .poll_sessions
                    .lock()
                    .unwrap()
                    .insert(sid.clone(), Vec::new());
                open_packet(&sid, PING_INTERVAL_MS, PING_TIMEOUT_MS).into_response()
            }
            Some(sid) => long_poll(&state, sid).await,
        },
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// Hold the request until packets are queued or the ping interval passes.
async fn long_poll(state: &MockState, sid: &str) -> Response {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(PING_INTERVAL_MS);
    loop {
        let drained = match state.poll_sessions.lock().unwrap().get_mut(sid) {
            Some(queue) => std::mem::take(queue),
            None => return StatusCode::BAD_REQUEST.into_response(),
        };
        if !drained.is_empty() {
            return drained.join("\u{1e}").into_response();
        }
        if tokio::time::Instant::now() >= deadline {
            return "2".into_response();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn engineio_post(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> StatusCode {
    let Some(sid) = query.get("sid") else {
        return StatusCode::BAD_REQUEST;
    };
    let mut sessions = state.poll_sessions.lock().unwrap();
    let Some(queue) = sessions.get_mut(sid) else {
        return StatusCode::BAD_REQUEST;
    };
    for packet in body.split('\u{1e}') {
        match packet {
            "40" => {
                queue.push(namespace_ack(sid));
                queue.push(envelope("connected", json!({ "status": "ok" })));
            }
            "41" | "1" => {
                sessions.remove(sid);
                break;
            }
            _ => {}
        }
    }
    StatusCode::OK
}

/// Wait for the client's namespace connect; false if the socket went away first.
async fn await_namespace_connect(socket: &mut WebSocket) -> bool {
    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) if text.as_str() == "40" => return true,
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return false,
            Some(Ok(_)) => {}
        }
    }
}

async fn serve_websocket(
    mut socket: WebSocket,
    sid: String,
    mut rx: broadcast::Receiver<String>,
    mut kick: broadcast::Receiver<()>,
    clients: Arc<AtomicUsize>,
) {
    clients.fetch_add(1, Ordering::SeqCst);
    let open = open_packet(&sid, PING_INTERVAL_MS, PING_TIMEOUT_MS);
    let joined = socket.send(Message::Text(open.into())).await.is_ok()
        && await_namespace_connect(&mut socket).await
        && socket
            .send(Message::Text(namespace_ack(&sid).into()))
            .await
            .is_ok()
        && socket
            .send(Message::Text(
                envelope("connected", json!({ "status": "ok" })).into(),
            ))
            .await
            .is_ok();
    if joined {
        let mut ping = tokio::time::interval(Duration::from_millis(PING_INTERVAL_MS));
        ping.tick().await;
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Ok(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = kick.recv() => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
                _ = ping.tick() => {
                    if socket.send(Message::Text("2".into())).await.is_err() {
                        break;
                    }
                }
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Text(text))) if text.as_str() == "41" => break,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
            }
        }
    }
    clients.fetch_sub(1, Ordering::SeqCst);
}

/// Endpoint that completes the handshake with a short heartbeat window and then never
/// sends another byte.
pub async fn spawn_silent_endpoint() -> String {
    let router = Router::new().route(
        "/socket.io/",
        get(|ws: WebSocketUpgrade| async move {
            ws.on_upgrade(|mut socket| async move {
                let open = open_packet("silent", 50, 50);
                if socket.send(Message::Text(open.into())).await.is_err()
                    || !await_namespace_connect(&mut socket).await
                    || socket
                        .send(Message::Text(namespace_ack("silent").into()))
                        .await
                        .is_err()
                {
                    return;
                }
                // Keep reading so the socket stays open, but never answer.
                while let Some(Ok(_)) = socket.recv().await {}
            })
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn command_handler(
    State(state): State<MockState>,
    Path(endpoint): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state
        .commands
        .lock()
        .unwrap()
        .push((endpoint.clone(), body.clone()));

    let overridden = state.responses.lock().unwrap().get(&endpoint).cloned();
    let (status, body) = overridden.unwrap_or_else(|| match endpoint.as_str() {
        "start_capture" | "start_simulator" => {
            (StatusCode::OK, json!({ "status": "started" }).to_string())
        }
        "stop_capture" | "stop_simulator" => {
            (StatusCode::OK, json!({ "status": "stopped" }).to_string())
        }
        "inject_attack" => (
            StatusCode::OK,
            json!({ "status": "success", "result": { "attack_type": body["attack_type"] } })
                .to_string(),
        ),
        "toggle_demo_mode" => (
            StatusCode::OK,
            json!({ "status": "success", "demo_mode": false, "message": "REAL mode (using model)" })
                .to_string(),
        ),
        _ => (StatusCode::NOT_FOUND, json!({ "error": "unknown" }).to_string()),
    });
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

async fn status_handler() -> Json<Value> {
    Json(json!({
        "capture_active": true,
        "simulator_active": false,
        "model_loaded": true,
        "interface": "eth-test",
        "stats": {
            "total_flows": 12,
            "total_alerts": 2,
            "model_accuracy": 0.9845,
            "packets_captured": 340
        }
    }))
}

async fn alerts_handler() -> Json<Value> {
    Json(json!([alert(1, "high", 0.85), alert(2, "critical", 0.93)]))
}
