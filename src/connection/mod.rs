// Connection lifecycle: one persistent session to the control endpoint, streaming transport
// preferred with polling fallback, bounded reconnects. Everything it learns goes out as
// ConnectionEvents on a single FIFO queue drained by the engine.

mod engineio;
mod polling;
mod websocket;

use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, timeout};
use tracing::Instrument;

use crate::events::InboundEvent;
use crate::models::ConnectionStatus;

pub use engineio::endpoint_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    WebSocket,
    Polling,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::WebSocket => "websocket",
            TransportKind::Polling => "polling",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid endpoint url {0:?}")]
    InvalidUrl(String),
    #[error("protocol: {0}")]
    Protocol(String),
    #[error("namespace connect refused: {0}")]
    Refused(String),
    /// Connect took too long, or an open session went silent past its heartbeat window.
    #[error("timed out")]
    Timeout,
    #[error("session closed by remote")]
    Closed,
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub base_url: String,
    pub transports: Vec<TransportKind>,
    /// Failed connect attempts tolerated after the first one before giving up.
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    /// Engine.IO mount path, normally `/socket.io/`.
    pub path: String,
    pub connect_timeout: Duration,
}

/// What the lifecycle manager reports to the engine, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Status(ConnectionStatus),
    Event(InboundEvent),
    /// Reconnect budget spent; the manager has exited.
    Exhausted,
}

pub(crate) enum Session {
    WebSocket(websocket::WsSession),
    Polling(polling::PollSession),
}

impl Session {
    fn kind(&self) -> TransportKind {
        match self {
            Session::WebSocket(_) => TransportKind::WebSocket,
            Session::Polling(_) => TransportKind::Polling,
        }
    }

    /// Next batch of events. An error ends the session.
    async fn recv(&mut self) -> Result<Vec<InboundEvent>, TransportError> {
        match self {
            Session::WebSocket(s) => s.recv().await,
            Session::Polling(s) => s.recv().await,
        }
    }

    async fn close(self) {
        match self {
            Session::WebSocket(s) => s.close().await,
            Session::Polling(s) => s.close().await,
        }
    }
}

enum SessionEnd {
    Lost(TransportError),
    Shutdown,
    EngineGone,
}

/// Spawns the lifecycle manager. It exits on shutdown, when `tx` closes, or when the
/// reconnect budget is spent (after sending [`ConnectionEvent::Exhausted`]).
pub fn spawn(
    config: ConnectionConfig,
    http: reqwest::Client,
    tx: mpsc::Sender<ConnectionEvent>,
    shutdown_rx: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    let span = tracing::span!(tracing::Level::DEBUG, "connection", base_url = %config.base_url);
    tokio::spawn(run(config, http, tx, shutdown_rx).instrument(span))
}

async fn run(
    config: ConnectionConfig,
    http: reqwest::Client,
    tx: mpsc::Sender<ConnectionEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut retries: u32 = 0;
    loop {
        let opened = tokio::select! {
            session = open_any(&config, &http) => session,
            _ = &mut shutdown_rx => return,
        };

        if let Some(mut session) = opened {
            retries = 0;
            tracing::info!(transport = session.kind().as_str(), "Connected to control endpoint");
            if tx
                .send(ConnectionEvent::Status(ConnectionStatus::Connected))
                .await
                .is_err()
            {
                return;
            }

            match pump(&mut session, &tx, &mut shutdown_rx).await {
                SessionEnd::Shutdown => {
                    session.close().await;
                    tracing::debug!("Connection manager shutting down");
                    return;
                }
                SessionEnd::EngineGone => {
                    session.close().await;
                    return;
                }
                SessionEnd::Lost(e) => {
                    tracing::warn!(error = %e, "Disconnected from control endpoint");
                    if tx
                        .send(ConnectionEvent::Status(ConnectionStatus::Disconnected))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
        }

        if retries >= config.reconnect_attempts {
            tracing::error!(
                attempts = config.reconnect_attempts,
                "Reconnect attempts exhausted; staying disconnected"
            );
            let _ = tx.send(ConnectionEvent::Exhausted).await;
            return;
        }
        retries += 1;
        tracing::debug!(retry = retries, max = config.reconnect_attempts, "Reconnecting");

        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            _ = &mut shutdown_rx => return,
        }
    }
}

/// Try each configured transport in order; first one that opens wins.
async fn open_any(config: &ConnectionConfig, http: &reqwest::Client) -> Option<Session> {
    for &kind in &config.transports {
        let opened = match kind {
            TransportKind::WebSocket => websocket::WsSession::open(config)
                .await
                .map(Session::WebSocket),
            TransportKind::Polling => polling::PollSession::open(config, http.clone())
                .await
                .map(Session::Polling),
        };
        match opened {
            Ok(session) => return Some(session),
            Err(e) => {
                tracing::debug!(transport = kind.as_str(), error = %e, "transport unavailable");
            }
        }
    }
    tracing::warn!("Could not reach control endpoint on any transport");
    None
}

/// Forward events until the session ends. Each batch is delivered in arrival order.
async fn pump(
    session: &mut Session,
    tx: &mpsc::Sender<ConnectionEvent>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    loop {
        let batch = tokio::select! {
            r = session.recv() => r,
            _ = &mut *shutdown_rx => return SessionEnd::Shutdown,
        };
        let events = match batch {
            Ok(events) => events,
            Err(e) => return SessionEnd::Lost(e),
        };
        for event in events {
            tracing::trace!(event = event.name(), "event received");
            if tx.send(ConnectionEvent::Event(event)).await.is_err() {
                return SessionEnd::EngineGone;
            }
        }
    }
}

async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    timeout(limit, fut)
        .await
        .unwrap_or(Err(TransportError::Timeout))
}
