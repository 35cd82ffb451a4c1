// Streaming transport: Engine.IO over a WebSocket, one packet per text frame

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::engineio::{self, Packet};
use super::{ConnectionConfig, TransportError, TransportKind, with_timeout};
use crate::events::{self, InboundEvent};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) struct WsSession {
    stream: Stream,
    idle_limit: Duration,
    /// Events that arrived before the namespace was joined.
    pending: Vec<InboundEvent>,
}

impl WsSession {
    /// Open the socket, read the handshake and join the default namespace.
    pub(crate) async fn open(config: &ConnectionConfig) -> Result<Self, TransportError> {
        let url = engineio::endpoint_url(&config.base_url, &config.path, TransportKind::WebSocket)?;
        with_timeout(config.connect_timeout, async {
            let (mut stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
            let handshake = match next_packet(&mut stream).await? {
                Packet::Open(handshake) => handshake,
                other => {
                    return Err(TransportError::Protocol(format!(
                        "expected open packet, got {other:?}"
                    )));
                }
            };
            stream.send(Message::Text(engineio::CONNECT.into())).await?;

            let mut pending = Vec::new();
            loop {
                match next_packet(&mut stream).await? {
                    Packet::NamespaceConnected => break,
                    Packet::Ping => stream.send(Message::Text(engineio::PONG.into())).await?,
                    Packet::ConnectError(reason) => return Err(TransportError::Refused(reason)),
                    Packet::Close | Packet::NamespaceDisconnected => {
                        return Err(TransportError::Closed);
                    }
                    Packet::Event { name, data } => {
                        if let Ok(event) = events::decode_event(&name, data) {
                            pending.push(event);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Self {
                stream,
                idle_limit: handshake.idle_limit(),
                pending,
            })
        })
        .await
    }

    /// Next event. Heartbeats are answered here; silence past the idle limit ends the session.
    pub(crate) async fn recv(&mut self) -> Result<Vec<InboundEvent>, TransportError> {
        if !self.pending.is_empty() {
            return Ok(std::mem::take(&mut self.pending));
        }
        loop {
            let msg = match timeout(self.idle_limit, self.stream.next()).await {
                Err(_) => return Err(TransportError::Timeout),
                Ok(None) => return Err(TransportError::Closed),
                Ok(Some(msg)) => msg?,
            };
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => return Err(TransportError::Closed),
                // Pongs are queued by tungstenite and flushed on the next read.
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {
                    continue;
                }
            };
            match engineio::decode(text.as_str()) {
                Ok(Packet::Ping) => {
                    self.stream
                        .send(Message::Text(engineio::PONG.into()))
                        .await?;
                }
                Ok(Packet::Event { name, data }) => match events::decode_event(&name, data) {
                    Ok(event) => return Ok(vec![event]),
                    Err(e) => tracing::warn!(event = %name, error = %e, "dropping undecodable event"),
                },
                Ok(Packet::Close | Packet::NamespaceDisconnected) => {
                    return Err(TransportError::Closed);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "dropping undecodable frame"),
            }
        }
    }

    pub(crate) async fn close(mut self) {
        let _ = self
            .stream
            .send(Message::Text(engineio::DISCONNECT.into()))
            .await;
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "websocket close failed");
        }
    }
}

/// Next Engine.IO packet during the handshake.
async fn next_packet(stream: &mut Stream) -> Result<Packet, TransportError> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return engineio::decode(text.as_str()),
            Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}
