// Alert payload and display record

use serde::{Deserialize, Serialize};

use super::lenient::lenient;
use super::traffic::clamp_fraction;

/// Attack labels the remote simulator knows how to inject.
pub const ATTACK_TYPES: [&str; 8] = [
    "DoS Hulk",
    "DDoS",
    "PortScan",
    "Bot",
    "FTP-Patator",
    "SSH-Patator",
    "Web Attack – XSS",
    "Web Attack – Sql Injection",
];

/// Coarse alert priority. Labels outside the known set are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Other(s) => s,
        }
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Other(s),
        }
    }
}

impl From<Severity> for String {
    fn from(s: Severity) -> Self {
        match s {
            Severity::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// `alert` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertRaised {
    #[serde(deserialize_with = "lenient")]
    pub id: u64,
    #[serde(deserialize_with = "lenient")]
    pub timestamp: String,
    #[serde(deserialize_with = "lenient")]
    pub severity: String,
    #[serde(deserialize_with = "lenient")]
    pub attack_type: String,
    #[serde(deserialize_with = "lenient")]
    pub src_ip: String,
    #[serde(deserialize_with = "lenient")]
    pub dst_ip: String,
    #[serde(deserialize_with = "lenient")]
    pub confidence: f64,
    #[serde(deserialize_with = "lenient")]
    pub flow_id: String,
    #[serde(deserialize_with = "lenient")]
    pub simulated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: u64,
    pub attack_type: String,
    pub src_ip: String,
    pub dst_ip: String,
    /// Fraction in [0, 1]; alerts are not rescaled for display.
    pub confidence: f64,
    pub severity: Severity,
    pub timestamp: String,
    pub flow_id: String,
    pub simulated: bool,
}

impl From<AlertRaised> for Alert {
    fn from(a: AlertRaised) -> Self {
        Self {
            id: a.id,
            attack_type: a.attack_type,
            src_ip: a.src_ip,
            dst_ip: a.dst_ip,
            confidence: clamp_fraction(a.confidence),
            severity: Severity::from(a.severity),
            timestamp: a.timestamp,
            flow_id: a.flow_id,
            simulated: a.simulated,
        }
    }
}
