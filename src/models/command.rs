// Control endpoint request and response bodies

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    Capture,
    Simulator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Start,
    Stop,
}

impl ToggleAction {
    /// Start when off, stop when on.
    pub fn for_current(on: bool) -> Self {
        if on { ToggleAction::Stop } else { ToggleAction::Start }
    }

    pub fn target(self) -> bool {
        self == ToggleAction::Start
    }
}

impl Toggle {
    /// Path segment under `/api/` for the given action.
    pub fn endpoint(self, action: ToggleAction) -> &'static str {
        match (self, action) {
            (Toggle::Capture, ToggleAction::Start) => "start_capture",
            (Toggle::Capture, ToggleAction::Stop) => "stop_capture",
            (Toggle::Simulator, ToggleAction::Start) => "start_simulator",
            (Toggle::Simulator, ToggleAction::Stop) => "stop_simulator",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub interface: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorRequest {
    pub interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectRequest {
    pub attack_type: String,
}

/// Any command response. Fields other than `status` are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandResponse {
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CommandResponse {
    /// `started` and `stopped` are the only success markers for toggle endpoints.
    pub fn confirms_toggle(&self) -> bool {
        self.status == "started" || self.status == "stopped"
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoModeResponse {
    pub status: String,
    pub demo_mode: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerStats {
    pub total_flows: u64,
    pub total_alerts: u64,
    pub model_accuracy: f64,
    pub packets_captured: u64,
}

/// `GET /api/status` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerStatus {
    pub capture_active: bool,
    pub simulator_active: bool,
    pub model_loaded: bool,
    pub interface: Option<String>,
    pub stats: ServerStats,
}
