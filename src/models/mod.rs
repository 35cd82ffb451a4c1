// Domain models: event payloads, display records, dashboard snapshot, command bodies

mod alert;
mod command;
mod dashboard;
mod lenient;
mod traffic;

pub use alert::{ATTACK_TYPES, Alert, AlertRaised, Severity};
pub use command::{
    CaptureRequest, CommandResponse, DemoModeResponse, InjectRequest, ServerStats, ServerStatus,
    SimulatorRequest, Toggle, ToggleAction,
};
pub use dashboard::{ConnectionStatus, DashboardSnapshot, DisplayStats, ToggleState};
pub use traffic::{FlowAnalyzed, FlowSample, PacketCaptured, PacketRecord, ServerHello};
