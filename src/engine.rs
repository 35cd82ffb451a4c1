// Dashboard engine: the one task that owns DashboardState.
// Connection events, presentation requests, command completions and timer ticks all pass
// through a single select! loop, so every state mutation runs to completion on its own.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Local;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Duration, Instant, interval, interval_at};

use crate::commands::{CommandClient, CommandError};
use crate::config::AppConfig;
use crate::connection::{self, ConnectionConfig, ConnectionEvent};
use crate::models::{
    AlertRaised, CommandResponse, DashboardSnapshot, DemoModeResponse, ServerStatus, Toggle,
    ToggleAction, ToggleState,
};
use crate::state::{BufferLimits, DashboardState};

/// Rate limit for the "no dashboard subscribers" message.
const NO_RECEIVERS_LOG_INTERVAL: Duration = Duration::from_secs(60);

const REQUEST_QUEUE_CAPACITY: usize = 64;
const CONNECTION_QUEUE_CAPACITY: usize = 1024;
const COMPLETION_QUEUE_CAPACITY: usize = 32;

/// Engine timing, buffer sizes and fixed command parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub limits: BufferLimits,
    pub accuracy: f64,
    pub sample_interval_ms: u64,
    pub snapshot_interval_ms: u64,
    pub stats_log_interval_secs: u64,
    pub interface: String,
    pub simulator_interval_secs: u64,
    pub connection: ConnectionConfig,
}

impl EngineConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            limits: config.buffers.limits(),
            accuracy: config.monitoring.accuracy,
            sample_interval_ms: config.monitoring.sample_interval_ms,
            snapshot_interval_ms: config.publishing.snapshot_frequency_ms,
            stats_log_interval_secs: config.monitoring.stats_log_interval_secs,
            interface: config.endpoint.interface.clone(),
            simulator_interval_secs: config.endpoint.simulator_interval_secs,
            connection: ConnectionConfig {
                base_url: config.endpoint.base_url.clone(),
                transports: config.connection.transports.clone(),
                reconnect_attempts: config.connection.reconnect_attempts,
                reconnect_delay: Duration::from_millis(config.connection.reconnect_delay_ms),
                path: config.connection.path.clone(),
                connect_timeout: Duration::from_millis(config.endpoint.request_timeout_ms),
            },
        }
    }
}

/// Command client, snapshot fan-out and shutdown for the engine.
pub struct EngineDeps {
    pub commands: CommandClient,
    pub snapshot_tx: broadcast::Sender<DashboardSnapshot>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

type Reply<T> = oneshot::Sender<Result<T, CommandError>>;

enum Request {
    Snapshot(oneshot::Sender<DashboardSnapshot>),
    Toggle { toggle: Toggle, reply: Reply<ToggleState> },
    Inject { attack_type: String, reply: Reply<CommandResponse> },
    ServerStatus(Reply<ServerStatus>),
    RecentAlerts(Reply<Vec<AlertRaised>>),
    DemoMode(Reply<DemoModeResponse>),
    Reconnect(oneshot::Sender<bool>),
}

enum Completion {
    Toggle {
        toggle: Toggle,
        action: ToggleAction,
        result: Result<CommandResponse, CommandError>,
        reply: Reply<ToggleState>,
    },
}

/// Cloneable front door to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    requests: mpsc::Sender<Request>,
    snapshot_tx: broadcast::Sender<DashboardSnapshot>,
    dashboard_clients: Arc<AtomicUsize>,
}

impl EngineHandle {
    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Request) -> Result<T, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(make(reply))
            .await
            .map_err(|_| CommandError::EngineStopped)?;
        rx.await.map_err(|_| CommandError::EngineStopped)?
    }

    /// Current state, taken between two engine steps.
    pub async fn snapshot(&self) -> Result<DashboardSnapshot, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::Snapshot(reply))
            .await
            .map_err(|_| CommandError::EngineStopped)?;
        rx.await.map_err(|_| CommandError::EngineStopped)
    }

    /// Periodic snapshots (every `snapshot_interval_ms`).
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Open `/ws/dashboard` sockets.
    pub fn dashboard_clients(&self) -> usize {
        self.dashboard_clients.load(Ordering::Relaxed)
    }

    pub(crate) fn dashboard_client_counter(&self) -> Arc<AtomicUsize> {
        self.dashboard_clients.clone()
    }

    /// Start capture if off, stop if on. Returns the toggles after the server confirmed.
    pub async fn toggle_capture(&self) -> Result<ToggleState, CommandError> {
        self.call(|reply| Request::Toggle {
            toggle: Toggle::Capture,
            reply,
        })
        .await
    }

    /// Start the attack simulator if off, stop if on.
    pub async fn toggle_simulator(&self) -> Result<ToggleState, CommandError> {
        self.call(|reply| Request::Toggle {
            toggle: Toggle::Simulator,
            reply,
        })
        .await
    }

    /// Ask the server to inject one synthetic attack. Never changes local state.
    pub async fn inject_attack(
        &self,
        attack_type: impl Into<String>,
    ) -> Result<CommandResponse, CommandError> {
        let attack_type = attack_type.into();
        self.call(|reply| Request::Inject { attack_type, reply })
            .await
    }

    pub async fn server_status(&self) -> Result<ServerStatus, CommandError> {
        self.call(Request::ServerStatus).await
    }

    pub async fn recent_alerts(&self) -> Result<Vec<AlertRaised>, CommandError> {
        self.call(Request::RecentAlerts).await
    }

    pub async fn toggle_demo_mode(&self) -> Result<DemoModeResponse, CommandError> {
        self.call(Request::DemoMode).await
    }

    /// Restart the connection manager after its reconnect budget ran out.
    /// Returns `false` if it is still running.
    pub async fn reconnect(&self) -> Result<bool, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::Reconnect(reply))
            .await
            .map_err(|_| CommandError::EngineStopped)?;
        rx.await.map_err(|_| CommandError::EngineStopped)
    }
}

struct ConnectionTask {
    handle: tokio::task::JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

struct Engine {
    state: DashboardState,
    commands: CommandClient,
    interface: String,
    simulator_interval_secs: u64,
    connection_config: ConnectionConfig,
    /// Events from the current manager only; each manager gets its own queue.
    conn_rx: mpsc::Receiver<ConnectionEvent>,
    connection: Option<ConnectionTask>,
    completion_tx: mpsc::Sender<Completion>,
}

impl Engine {
    /// Start a manager on a fresh queue. Whatever a replaced manager still sends is dropped
    /// with its old queue.
    fn start_connection(&mut self) {
        let (conn_tx, conn_rx) = mpsc::channel(CONNECTION_QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = connection::spawn(
            self.connection_config.clone(),
            self.commands.http().clone(),
            conn_tx,
            shutdown_rx,
        );
        self.conn_rx = conn_rx;
        self.connection = Some(ConnectionTask {
            handle,
            shutdown_tx,
        });
    }

    async fn stop_connection(&mut self) {
        if let Some(task) = self.connection.take() {
            let _ = task.shutdown_tx.send(());
            let _ = task.handle.await;
        }
    }

    fn on_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Status(status) => {
                if self.state.set_connection(status) {
                    tracing::info!(status = ?status, "Connection status changed");
                }
            }
            ConnectionEvent::Event(event) => self.state.apply(event, Local::now()),
            ConnectionEvent::Exhausted => self.state.mark_reconnect_exhausted(),
        }
    }

    fn on_request(&mut self, request: Request) {
        match request {
            Request::Snapshot(reply) => {
                let _ = reply.send(self.state.snapshot());
            }
            Request::Toggle { toggle, reply } => self.start_toggle(toggle, reply),
            Request::Inject { attack_type, reply } => {
                let client = self.commands.clone();
                tracing::info!(attack_type = %attack_type, "Injecting attack");
                self.spawn_query("inject_attack", reply, async move {
                    client.inject_attack(&attack_type).await
                });
            }
            Request::ServerStatus(reply) => {
                let client = self.commands.clone();
                self.spawn_query("server_status", reply, async move {
                    client.server_status().await
                });
            }
            Request::RecentAlerts(reply) => {
                let client = self.commands.clone();
                self.spawn_query("recent_alerts", reply, async move {
                    client.recent_alerts().await
                });
            }
            Request::DemoMode(reply) => {
                let client = self.commands.clone();
                self.spawn_query("toggle_demo_mode", reply, async move {
                    client.toggle_demo_mode().await
                });
            }
            Request::Reconnect(reply) => {
                let _ = reply.send(self.reconnect());
            }
        }
    }

    /// Reject with NotConnected unless the link is up; nothing is sent in that case.
    fn gate<T>(&self, operation: &'static str, reply: Reply<T>) -> Option<Reply<T>> {
        if self.state.connection().is_connected() {
            Some(reply)
        } else {
            tracing::debug!(operation, "command rejected: not connected");
            let _ = reply.send(Err(CommandError::NotConnected));
            None
        }
    }

    /// Run a call that never touches dashboard state and hand its result straight back.
    fn spawn_query<T, F>(&self, operation: &'static str, reply: Reply<T>, call: F)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, CommandError>> + Send + 'static,
    {
        let Some(reply) = self.gate(operation, reply) else {
            return;
        };
        tokio::spawn(async move {
            let result = call.await;
            if let Err(e) = &result {
                tracing::warn!(operation, error = %e, "command failed");
            }
            let _ = reply.send(result);
        });
    }

    fn start_toggle(&self, toggle: Toggle, reply: Reply<ToggleState>) {
        let Some(reply) = self.gate("toggle", reply) else {
            return;
        };
        let action = ToggleAction::for_current(self.state.is_on(toggle));
        let client = self.commands.clone();
        let interface = self.interface.clone();
        let interval_secs = self.simulator_interval_secs;
        let done = self.completion_tx.clone();
        tracing::debug!(toggle = ?toggle, action = ?action, "toggle requested");
        tokio::spawn(async move {
            let result = match toggle {
                Toggle::Capture => client.capture(action, &interface).await,
                Toggle::Simulator => client.simulator(action, interval_secs).await,
            };
            // Dropped if the engine is gone.
            let _ = done
                .send(Completion::Toggle {
                    toggle,
                    action,
                    result,
                    reply,
                })
                .await;
        });
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Toggle {
                toggle,
                action,
                result,
                reply,
            } => {
                let outcome = match result {
                    Ok(response) if response.confirms_toggle() => {
                        self.state.confirm_toggle(toggle, action);
                        tracing::info!(toggle = ?toggle, status = %response.status, "Toggle confirmed");
                        Ok(self.state.toggles())
                    }
                    Ok(response) => {
                        tracing::warn!(
                            toggle = ?toggle,
                            status = %response.status,
                            "Toggle not confirmed by server"
                        );
                        Err(CommandError::Rejected(response.status))
                    }
                    Err(e) => {
                        tracing::warn!(toggle = ?toggle, error = %e, "Toggle request failed");
                        Err(e)
                    }
                };
                let _ = reply.send(outcome);
            }
        }
    }

    fn reconnect(&mut self) -> bool {
        // An exhausted manager is already on its way out even if its task has not finished yet.
        let running = !self.state.reconnect_exhausted()
            && self
                .connection
                .as_ref()
                .is_some_and(|task| !task.handle.is_finished());
        if running {
            return false;
        }
        tracing::info!("Manual reconnect requested");
        self.state.clear_reconnect_exhausted();
        self.start_connection();
        true
    }
}

/// Spawns the engine and its connection manager.
pub fn spawn(
    deps: EngineDeps,
    config: EngineConfig,
) -> (EngineHandle, tokio::task::JoinHandle<()>) {
    let EngineDeps {
        commands,
        snapshot_tx,
        mut shutdown_rx,
    } = deps;
    let EngineConfig {
        limits,
        accuracy,
        sample_interval_ms,
        snapshot_interval_ms,
        stats_log_interval_secs,
        interface,
        simulator_interval_secs,
        connection,
    } = config;

    let (request_tx, mut request_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    // Replaced by the first start_connection.
    let (_, conn_rx) = mpsc::channel(1);
    let (completion_tx, mut completion_rx) = mpsc::channel(COMPLETION_QUEUE_CAPACITY);

    let handle = EngineHandle {
        requests: request_tx,
        snapshot_tx: snapshot_tx.clone(),
        dashboard_clients: Arc::new(AtomicUsize::new(0)),
    };
    let dashboard_clients = handle.dashboard_clients.clone();

    let task = tokio::spawn(async move {
        let mut engine = Engine {
            state: DashboardState::new(limits, accuracy),
            commands,
            interface,
            simulator_interval_secs,
            connection_config: connection,
            conn_rx,
            connection: None,
            completion_tx,
        };
        engine.start_connection();

        let sample_period = Duration::from_millis(sample_interval_ms);
        let mut sample_tick = interval_at(Instant::now() + sample_period, sample_period);
        sample_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut snapshot_tick = interval(Duration::from_millis(snapshot_interval_ms));
        snapshot_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut last_no_receivers_log: Option<Instant> = None;

        loop {
            tokio::select! {
                Some(event) = engine.conn_rx.recv() => {
                    engine.on_connection_event(event);
                    // Drain whatever else is already queued before yielding.
                    while let Ok(event) = engine.conn_rx.try_recv() {
                        engine.on_connection_event(event);
                    }
                }
                Some(request) = request_rx.recv() => engine.on_request(request),
                Some(completion) = completion_rx.recv() => engine.on_completion(completion),
                _ = sample_tick.tick() => {
                    let rate = engine.state.sample();
                    tracing::trace!(packets_per_second = rate, "packet rate sampled");
                }
                _ = snapshot_tick.tick() => {
                    if snapshot_tx.receiver_count() == 0 {
                        let should_log = last_no_receivers_log
                            .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_LOG_INTERVAL);
                        if should_log {
                            tracing::debug!(
                                operation = "broadcast_snapshot",
                                "No dashboard clients; snapshot channel has no receivers"
                            );
                            last_no_receivers_log = Some(Instant::now());
                        }
                    } else {
                        let _ = snapshot_tx.send(engine.state.snapshot());
                    }
                }
                _ = stats_log_tick.tick() => {
                    let counters = engine.state.counters();
                    tracing::info!(
                        connection = ?engine.state.connection(),
                        flows_analyzed = counters.flows_analyzed,
                        attacks_detected = counters.attacks_detected,
                        packets_buffered = engine.state.packets().len(),
                        alerts_buffered = engine.state.alerts().len(),
                        dashboard_clients = dashboard_clients.load(Ordering::Relaxed),
                        "app stats"
                    );
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Engine shutting down");
                    break;
                }
            }
        }

        // Closing the queue first keeps the manager from blocking on a full channel.
        engine.conn_rx.close();
        engine.stop_connection().await;
    });

    (handle, task)
}
