// Connection status, toggles, display stats and the read-only dashboard snapshot

use serde::{Deserialize, Serialize};

use super::{Alert, FlowSample, PacketRecord};

/// Two-valued link state; there is no "connecting" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

/// Last server-confirmed state of the capture and simulator switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleState {
    pub is_capturing: bool,
    pub is_simulating: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayStats {
    pub packets_per_second: u64,
    pub flows_analyzed: u64,
    pub attacks_detected: u64,
    /// Model-reported constant from config, not derived from events.
    pub accuracy: f64,
}

/// Copy of the whole dashboard state taken between two engine steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub connection: ConnectionStatus,
    /// Server sent its `connected` confirmation on the current session.
    pub server_confirmed: bool,
    /// Automatic reconnects gave up; only a manual reconnect will retry.
    pub reconnect_exhausted: bool,
    pub toggles: ToggleState,
    pub stats: DisplayStats,
    /// Newest first.
    pub packets: Vec<PacketRecord>,
    /// Oldest first.
    pub flows: Vec<FlowSample>,
    /// Newest first.
    pub alerts: Vec<Alert>,
}
