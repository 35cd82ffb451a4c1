// Polling fallback: Engine.IO long-polling. GET returns queued packets (or a heartbeat),
// POST carries the client's packets.

use tokio::time::Duration;

use super::engineio::{self, Packet};
use super::{ConnectionConfig, TransportError, TransportKind, with_timeout};
use crate::events::{self, InboundEvent};

pub(crate) struct PollSession {
    http: reqwest::Client,
    /// Endpoint URL including the session id.
    url: String,
    idle_limit: Duration,
    /// Events that arrived with the namespace acknowledgement.
    pending: Vec<InboundEvent>,
}

impl PollSession {
    /// Handshake, then join the default namespace.
    pub(crate) async fn open(
        config: &ConnectionConfig,
        http: reqwest::Client,
    ) -> Result<Self, TransportError> {
        let base = engineio::endpoint_url(&config.base_url, &config.path, TransportKind::Polling)?;
        with_timeout(config.connect_timeout, async {
            let body = http.get(&base).send().await?.error_for_status()?.text().await?;
            let handshake = match engineio::decode_payload(&body).next() {
                Some(Ok(Packet::Open(handshake))) => handshake,
                Some(Err(e)) => return Err(e),
                _ => {
                    return Err(TransportError::Protocol(
                        "polling response without open packet".into(),
                    ));
                }
            };
            let mut session = Self {
                url: format!("{base}&sid={}", handshake.sid),
                http,
                idle_limit: handshake.idle_limit(),
                pending: Vec::new(),
            };
            session.post(engineio::CONNECT).await?;

            loop {
                let body = session.get().await?;
                let mut joined = false;
                for packet in engineio::decode_payload(&body) {
                    match packet? {
                        Packet::NamespaceConnected => joined = true,
                        Packet::Ping => session.post(engineio::PONG).await?,
                        Packet::ConnectError(reason) => return Err(TransportError::Refused(reason)),
                        Packet::Close | Packet::NamespaceDisconnected => {
                            return Err(TransportError::Closed);
                        }
                        Packet::Event { name, data } => {
                            if let Ok(event) = events::decode_event(&name, data) {
                                session.pending.push(event);
                            }
                        }
                        _ => {}
                    }
                }
                if joined {
                    return Ok(session);
                }
            }
        })
        .await
    }

    pub(crate) async fn recv(&mut self) -> Result<Vec<InboundEvent>, TransportError> {
        if !self.pending.is_empty() {
            return Ok(std::mem::take(&mut self.pending));
        }
        loop {
            let body = self.get().await?;
            let mut batch = Vec::new();
            for packet in engineio::decode_payload(&body) {
                match packet {
                    Ok(Packet::Ping) => self.post(engineio::PONG).await?,
                    Ok(Packet::Event { name, data }) => match events::decode_event(&name, data) {
                        Ok(event) => batch.push(event),
                        Err(e) => {
                            tracing::warn!(event = %name, error = %e, "dropping undecodable polled event");
                        }
                    },
                    Ok(Packet::Close | Packet::NamespaceDisconnected) => {
                        return Err(TransportError::Closed);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "dropping undecodable polled packet"),
                }
            }
            if !batch.is_empty() {
                return Ok(batch);
            }
        }
    }

    pub(crate) async fn close(self) {
        if let Err(e) = self.post(engineio::DISCONNECT).await {
            tracing::debug!(error = %e, "polling disconnect failed");
        }
    }

    /// Long-poll; the server answers within its ping interval, so the idle limit bounds the wait.
    async fn get(&self) -> Result<String, TransportError> {
        let response = self
            .http
            .get(&self.url)
            .timeout(self.idle_limit)
            .send()
            .await
            .map_err(timeout_or_http)?
            .error_for_status()?;
        response.text().await.map_err(timeout_or_http)
    }

    async fn post(&self, packet: &str) -> Result<(), TransportError> {
        self.http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(packet.to_string())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn timeout_or_http(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Http(e)
    }
}
