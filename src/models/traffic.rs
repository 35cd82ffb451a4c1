// Packet and flow payloads from the event stream, and the records kept for display

use serde::{Deserialize, Serialize};

use super::lenient::lenient;

/// `packet_captured` payload. Missing or mistyped fields default; nothing is validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketCaptured {
    #[serde(deserialize_with = "lenient")]
    pub timestamp: String,
    #[serde(deserialize_with = "lenient")]
    pub src_ip: String,
    #[serde(deserialize_with = "lenient")]
    pub dst_ip: String,
    #[serde(deserialize_with = "lenient")]
    pub protocol: String,
    #[serde(deserialize_with = "lenient")]
    pub size: u64,
}

/// `flow_analyzed` payload. Only `packets`, `confidence` and `is_attack` feed the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowAnalyzed {
    #[serde(deserialize_with = "lenient")]
    pub timestamp: String,
    #[serde(deserialize_with = "lenient")]
    pub flow_id: String,
    #[serde(deserialize_with = "lenient")]
    pub src_ip: String,
    #[serde(deserialize_with = "lenient")]
    pub dst_ip: String,
    #[serde(deserialize_with = "lenient")]
    pub protocol: String,
    #[serde(deserialize_with = "lenient")]
    pub packets: u64,
    #[serde(deserialize_with = "lenient")]
    pub bytes: u64,
    #[serde(deserialize_with = "lenient")]
    pub attack_type: String,
    /// Classifier certainty in [0, 1].
    #[serde(deserialize_with = "lenient")]
    pub confidence: f64,
    #[serde(deserialize_with = "lenient")]
    pub is_attack: bool,
    #[serde(deserialize_with = "lenient")]
    pub simulated: bool,
}

/// `connected` payload sent once by the server after the session opens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerHello {
    #[serde(deserialize_with = "lenient")]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketRecord {
    pub timestamp: String,
    pub src_ip: String,
    pub dst_ip: String,
    pub protocol: String,
    pub size: u64,
}

impl From<PacketCaptured> for PacketRecord {
    fn from(p: PacketCaptured) -> Self {
        Self {
            timestamp: p.timestamp,
            src_ip: p.src_ip,
            dst_ip: p.dst_ip,
            protocol: p.protocol,
            size: p.size,
        }
    }
}

/// One point of the flow chart: receipt time, packet count, confidence as a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSample {
    pub time: String,
    pub packets: u64,
    /// Percentage in [0, 100].
    pub confidence: f64,
}

impl FlowSample {
    pub fn new(flow: &FlowAnalyzed, time: String) -> Self {
        Self {
            time,
            packets: flow.packets,
            confidence: clamp_fraction(flow.confidence) * 100.0,
        }
    }
}

/// Clamp to [0, 1]; non-finite input becomes 0.
pub(crate) fn clamp_fraction(x: f64) -> f64 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}
