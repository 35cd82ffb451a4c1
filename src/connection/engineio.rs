// Engine.IO v4 packet framing with Socket.IO v5 messages on the default namespace.
//
//   0{handshake}   open            2  ping (server → client)    3  pong
//   1              close           6  noop
//   40{..}         namespace connected    41  namespace disconnected
//   42["name",{}]  event           44{..} connect error
//
// Polling payloads join packets with the 0x1e record separator.

use serde::Deserialize;
use tokio::time::Duration;

use super::{TransportError, TransportKind};

pub(crate) const RECORD_SEPARATOR: char = '\u{1e}';

/// Client → server: join the default namespace.
pub(crate) const CONNECT: &str = "40";
/// Client → server: leave the default namespace.
pub(crate) const DISCONNECT: &str = "41";
/// Client → server: heartbeat answer.
pub(crate) const PONG: &str = "3";

/// Body of the open packet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Handshake {
    pub sid: String,
    pub ping_interval: u64,
    pub ping_timeout: u64,
}

impl Handshake {
    /// With no traffic at all for this long the server's heartbeat is overdue and the link is dead.
    pub fn idle_limit(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Noop,
    NamespaceConnected,
    NamespaceDisconnected,
    ConnectError(String),
    Event { name: String, data: serde_json::Value },
    /// Acks, binary events, upgrades and other namespaces.
    Ignored,
}

fn protocol(msg: impl Into<String>) -> TransportError {
    TransportError::Protocol(msg.into())
}

fn split_type(text: &str) -> Option<(char, &str)> {
    let mut chars = text.chars();
    let kind = chars.next()?;
    Some((kind, chars.as_str()))
}

pub(crate) fn decode(text: &str) -> Result<Packet, TransportError> {
    let (kind, body) = split_type(text).ok_or_else(|| protocol("empty packet"))?;
    match kind {
        '0' => serde_json::from_str(body)
            .map(Packet::Open)
            .map_err(|e| protocol(format!("bad handshake: {e}"))),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_message(body),
        '5' => Ok(Packet::Ignored),
        '6' => Ok(Packet::Noop),
        other => Err(protocol(format!("unknown packet type {other:?}"))),
    }
}

fn decode_message(body: &str) -> Result<Packet, TransportError> {
    let (kind, rest) = split_type(body).ok_or_else(|| protocol("empty message"))?;
    // Other namespaces are prefixed with "/name,".
    if rest.starts_with('/') {
        return Ok(Packet::Ignored);
    }
    match kind {
        '0' => Ok(Packet::NamespaceConnected),
        '1' => Ok(Packet::NamespaceDisconnected),
        '2' => decode_event(rest),
        '4' => Ok(Packet::ConnectError(rest.to_string())),
        _ => Ok(Packet::Ignored),
    }
}

fn decode_event(rest: &str) -> Result<Packet, TransportError> {
    // An ack id may precede the argument array.
    let args = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    let args: Vec<serde_json::Value> =
        serde_json::from_str(args).map_err(|e| protocol(format!("bad event arguments: {e}")))?;
    let mut args = args.into_iter();
    let name = match args.next() {
        Some(serde_json::Value::String(name)) => name,
        _ => return Err(protocol("event without a name")),
    };
    let data = args.next().unwrap_or(serde_json::Value::Null);
    Ok(Packet::Event { name, data })
}

/// Split a polling payload into its packets.
pub(crate) fn decode_payload(body: &str) -> impl Iterator<Item = Result<Packet, TransportError>> + '_ {
    body.split(RECORD_SEPARATOR)
        .filter(|part| !part.is_empty())
        .map(decode)
}

/// Engine.IO endpoint for a transport, e.g. `ws://host:5000/socket.io/?EIO=4&transport=websocket`.
pub fn endpoint_url(
    base_url: &str,
    path: &str,
    transport: TransportKind,
) -> Result<String, TransportError> {
    let (scheme, rest) = base_url
        .trim_end_matches('/')
        .split_once("://")
        .ok_or_else(|| TransportError::InvalidUrl(base_url.to_string()))?;
    let scheme = match (scheme, transport) {
        ("http", TransportKind::WebSocket) => "ws",
        ("https", TransportKind::WebSocket) => "wss",
        ("http" | "https", TransportKind::Polling) => scheme,
        _ => return Err(TransportError::InvalidUrl(base_url.to_string())),
    };
    Ok(format!(
        "{scheme}://{rest}{path}?EIO=4&transport={}",
        transport.as_str()
    ))
}
