// Inbound events: Socket.IO event name plus its JSON payload

use serde::Deserialize;

use crate::models::{AlertRaised, FlowAnalyzed, PacketCaptured, ServerHello};

/// One decoded event from the control endpoint's stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    PacketCaptured(PacketCaptured),
    FlowAnalyzed(FlowAnalyzed),
    Alert(AlertRaised),
    Connected(ServerHello),
}

impl InboundEvent {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::PacketCaptured(_) => "packet_captured",
            InboundEvent::FlowAnalyzed(_) => "flow_analyzed",
            InboundEvent::Alert(_) => "alert",
            InboundEvent::Connected(_) => "connected",
        }
    }
}

/// Decode a named event. Unknown names and payloads that are not JSON objects are errors;
/// missing or mistyped payload fields are not.
pub fn decode_event(name: &str, data: serde_json::Value) -> Result<InboundEvent, serde_json::Error> {
    decode_value(serde_json::json!({ "event": name, "data": data }))
}

/// Decode an `{"event": ..., "data": ...}` envelope.
pub fn decode_value(value: serde_json::Value) -> Result<InboundEvent, serde_json::Error> {
    serde_json::from_value(value)
}
