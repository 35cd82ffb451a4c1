// Dashboard state: bounded buffers, counters, toggles and link status.
// Owned by the engine task; every mutation below runs to completion before the next message.

mod buffer;

pub use buffer::{Chronological, NewestFirst};

use chrono::{DateTime, Local};

use crate::events::InboundEvent;
use crate::models::{
    Alert, AlertRaised, ConnectionStatus, DashboardSnapshot, DisplayStats, FlowAnalyzed,
    FlowSample, PacketCaptured, PacketRecord, Toggle, ToggleAction, ToggleState,
};

/// Time label format for flow samples (wall clock at receipt).
const FLOW_TIME_FORMAT: &str = "%H:%M:%S";

/// Capacities of the three display buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLimits {
    pub packets: usize,
    pub flows: usize,
    pub alerts: usize,
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self {
            packets: 100,
            flows: 20,
            alerts: 50,
        }
    }
}

/// Event-driven counters. `packet_counter` is zeroed by every sampling tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub flows_analyzed: u64,
    pub attacks_detected: u64,
    pub packet_counter: u64,
}

#[derive(Debug)]
pub struct DashboardState {
    connection: ConnectionStatus,
    server_confirmed: bool,
    reconnect_exhausted: bool,
    toggles: ToggleState,
    packets: NewestFirst<PacketRecord>,
    flows: Chronological<FlowSample>,
    alerts: NewestFirst<Alert>,
    counters: Counters,
    packets_per_second: u64,
    accuracy: f64,
}

impl DashboardState {
    pub fn new(limits: BufferLimits, accuracy: f64) -> Self {
        Self {
            connection: ConnectionStatus::Disconnected,
            server_confirmed: false,
            reconnect_exhausted: false,
            toggles: ToggleState::default(),
            packets: NewestFirst::new(limits.packets),
            flows: Chronological::new(limits.flows),
            alerts: NewestFirst::new(limits.alerts),
            counters: Counters::default(),
            packets_per_second: 0,
            accuracy,
        }
    }

    /// Apply one inbound event. `received_at` labels flow samples.
    pub fn apply(&mut self, event: InboundEvent, received_at: DateTime<Local>) {
        match event {
            InboundEvent::PacketCaptured(p) => self.ingest_packet(p),
            InboundEvent::FlowAnalyzed(f) => {
                self.ingest_flow(&f, received_at.format(FLOW_TIME_FORMAT).to_string())
            }
            InboundEvent::Alert(a) => self.ingest_alert(a),
            InboundEvent::Connected(hello) => {
                tracing::debug!(status = %hello.status, "server confirmed connection");
                self.server_confirmed = true;
            }
        }
    }

    pub fn ingest_packet(&mut self, packet: PacketCaptured) {
        self.packets.push(PacketRecord::from(packet));
        self.counters.packet_counter = self.counters.packet_counter.saturating_add(1);
    }

    pub fn ingest_flow(&mut self, flow: &FlowAnalyzed, time: String) {
        self.flows.push(FlowSample::new(flow, time));
        self.counters.flows_analyzed = self.counters.flows_analyzed.saturating_add(1);
        if flow.is_attack {
            self.counters.attacks_detected = self.counters.attacks_detected.saturating_add(1);
        }
    }

    pub fn ingest_alert(&mut self, alert: AlertRaised) {
        self.alerts.push(Alert::from(alert));
    }

    /// Sampling tick: publish the packet counter as the per-second rate and reset it.
    /// Returns the published rate.
    pub fn sample(&mut self) -> u64 {
        self.packets_per_second = std::mem::take(&mut self.counters.packet_counter);
        self.packets_per_second
    }

    /// Record a link transition. Returns `true` if the status changed.
    pub fn set_connection(&mut self, status: ConnectionStatus) -> bool {
        if status.is_connected() {
            self.reconnect_exhausted = false;
        } else {
            self.server_confirmed = false;
        }
        let changed = self.connection != status;
        self.connection = status;
        changed
    }

    pub fn mark_reconnect_exhausted(&mut self) {
        self.reconnect_exhausted = true;
    }

    pub fn clear_reconnect_exhausted(&mut self) {
        self.reconnect_exhausted = false;
    }

    /// Apply a server-confirmed toggle action.
    pub fn confirm_toggle(&mut self, toggle: Toggle, action: ToggleAction) {
        let on = action.target();
        match toggle {
            Toggle::Capture => self.toggles.is_capturing = on,
            Toggle::Simulator => self.toggles.is_simulating = on,
        }
    }

    pub fn is_on(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::Capture => self.toggles.is_capturing,
            Toggle::Simulator => self.toggles.is_simulating,
        }
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn reconnect_exhausted(&self) -> bool {
        self.reconnect_exhausted
    }

    pub fn toggles(&self) -> ToggleState {
        self.toggles
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn packets(&self) -> &NewestFirst<PacketRecord> {
        &self.packets
    }

    pub fn flows(&self) -> &Chronological<FlowSample> {
        &self.flows
    }

    pub fn alerts(&self) -> &NewestFirst<Alert> {
        &self.alerts
    }

    pub fn stats(&self) -> DisplayStats {
        DisplayStats {
            packets_per_second: self.packets_per_second,
            flows_analyzed: self.counters.flows_analyzed,
            attacks_detected: self.counters.attacks_detected,
            accuracy: self.accuracy,
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            connection: self.connection,
            server_confirmed: self.server_confirmed,
            reconnect_exhausted: self.reconnect_exhausted,
            toggles: self.toggles,
            stats: self.stats(),
            packets: self.packets.to_vec(),
            flows: self.flows.to_vec(),
            alerts: self.alerts.to_vec(),
        }
    }
}
