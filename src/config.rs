use serde::Deserialize;

use crate::connection::TransportKind;
use crate::state::BufferLimits;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub buffers: BufferConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
}

/// Remote control endpoint: event stream and command API share `base_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    /// Capture interface sent with start/stop_capture.
    pub interface: String,
    #[serde(default = "default_simulator_interval_secs")]
    pub simulator_interval_secs: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_simulator_interval_secs() -> u64 {
    15
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSettings {
    /// Transport preference order; each connect attempt walks the whole list.
    #[serde(default = "default_transports")]
    pub transports: Vec<TransportKind>,
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Engine.IO mount path on the control endpoint.
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_transports() -> Vec<TransportKind> {
    vec![TransportKind::WebSocket, TransportKind::Polling]
}

fn default_reconnect_attempts() -> u32 {
    10
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_path() -> String {
    "/socket.io/".to_string()
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            transports: default_transports(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            path: default_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Model accuracy shown on the dashboard, as a percentage.
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,
    /// How often to log app stats (connection, counters, dashboard clients) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_sample_interval_ms() -> u64 {
    1000
}

fn default_accuracy() -> f64 {
    98.45
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            accuracy: default_accuracy(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BufferConfig {
    #[serde(default = "default_packet_capacity")]
    pub packet_capacity: usize,
    #[serde(default = "default_flow_capacity")]
    pub flow_capacity: usize,
    #[serde(default = "default_alert_capacity")]
    pub alert_capacity: usize,
}

fn default_packet_capacity() -> usize {
    100
}

fn default_flow_capacity() -> usize {
    20
}

fn default_alert_capacity() -> usize {
    50
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            packet_capacity: default_packet_capacity(),
            flow_capacity: default_flow_capacity(),
            alert_capacity: default_alert_capacity(),
        }
    }
}

impl BufferConfig {
    pub fn limits(&self) -> BufferLimits {
        BufferLimits {
            packets: self.packet_capacity,
            flows: self.flow_capacity,
            alerts: self.alert_capacity,
        }
    }
}

/// Local HTTP/WebSocket surface for the presentation layer.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    #[serde(default = "default_snapshot_frequency_ms")]
    pub snapshot_frequency_ms: u64,
    /// Max number of snapshots kept in the broadcast channel for /ws/dashboard (slow clients may lag).
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_snapshot_frequency_ms() -> u64 {
    1000
}

fn default_broadcast_capacity() -> usize {
    16
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            snapshot_frequency_ms: default_snapshot_frequency_ms(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let base = self.endpoint.base_url.as_str();
        anyhow::ensure!(
            base.starts_with("http://") || base.starts_with("https://"),
            "endpoint.base_url must start with http:// or https://, got {:?}",
            base
        );
        anyhow::ensure!(
            !self.endpoint.interface.is_empty(),
            "endpoint.interface must be non-empty"
        );
        anyhow::ensure!(
            self.endpoint.simulator_interval_secs > 0,
            "endpoint.simulator_interval_secs must be > 0, got {}",
            self.endpoint.simulator_interval_secs
        );
        anyhow::ensure!(
            self.endpoint.request_timeout_ms > 0,
            "endpoint.request_timeout_ms must be > 0, got {}",
            self.endpoint.request_timeout_ms
        );
        anyhow::ensure!(
            !self.connection.transports.is_empty(),
            "connection.transports must list at least one transport"
        );
        anyhow::ensure!(
            self.connection.reconnect_delay_ms > 0,
            "connection.reconnect_delay_ms must be > 0, got {}",
            self.connection.reconnect_delay_ms
        );
        anyhow::ensure!(
            self.connection.path.starts_with('/'),
            "connection.path must start with '/', got {:?}",
            self.connection.path
        );
        anyhow::ensure!(
            self.monitoring.sample_interval_ms > 0,
            "monitoring.sample_interval_ms must be > 0, got {}",
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            (0.0..=100.0).contains(&self.monitoring.accuracy),
            "monitoring.accuracy must be within 0..=100, got {}",
            self.monitoring.accuracy
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.buffers.packet_capacity > 0,
            "buffers.packet_capacity must be > 0, got {}",
            self.buffers.packet_capacity
        );
        anyhow::ensure!(
            self.buffers.flow_capacity > 0,
            "buffers.flow_capacity must be > 0, got {}",
            self.buffers.flow_capacity
        );
        anyhow::ensure!(
            self.buffers.alert_capacity > 0,
            "buffers.alert_capacity must be > 0, got {}",
            self.buffers.alert_capacity
        );
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.publishing.snapshot_frequency_ms > 0,
            "publishing.snapshot_frequency_ms must be > 0, got {}",
            self.publishing.snapshot_frequency_ms
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        Ok(())
    }
}
