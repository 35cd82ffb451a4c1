// Request/response calls to the control endpoint's command API

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::models::{
    AlertRaised, CaptureRequest, CommandResponse, DemoModeResponse, InjectRequest, ServerStatus,
    SimulatorRequest, Toggle, ToggleAction,
};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Rejected locally; nothing was sent.
    #[error("not connected to the control endpoint")]
    NotConnected,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server answered with status {0:?}")]
    Rejected(String),
    #[error("dashboard engine is not running")]
    EngineStopped,
}

/// HTTP client for `{base_url}/api/...`. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CommandClient {
    http: reqwest::Client,
    base_url: String,
}

impl CommandClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the shared HTTP client used for commands and polling.
    pub fn http_client(request_timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(format!("{}/{}", crate::version::NAME, crate::version::VERSION))
            .build()
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, endpoint)
    }

    /// POST a JSON body. The body is parsed regardless of HTTP status.
    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R, CommandError> {
        let response = self.http.post(self.url(endpoint)).json(body).send().await?;
        tracing::debug!(endpoint, status = %response.status(), "command response");
        Ok(response.json().await?)
    }

    async fn get<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, CommandError> {
        let response = self
            .http
            .get(self.url(endpoint))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn capture(
        &self,
        action: ToggleAction,
        interface: &str,
    ) -> Result<CommandResponse, CommandError> {
        let body = CaptureRequest {
            interface: interface.to_string(),
        };
        self.post(Toggle::Capture.endpoint(action), &body).await
    }

    pub async fn simulator(
        &self,
        action: ToggleAction,
        interval_secs: u64,
    ) -> Result<CommandResponse, CommandError> {
        let body = SimulatorRequest {
            interval: interval_secs,
        };
        self.post(Toggle::Simulator.endpoint(action), &body).await
    }

    /// Single-shot injection. Any status other than `success` is a rejection.
    pub async fn inject_attack(&self, attack_type: &str) -> Result<CommandResponse, CommandError> {
        let body = InjectRequest {
            attack_type: attack_type.to_string(),
        };
        let response: CommandResponse = self.post("inject_attack", &body).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(CommandError::Rejected(response.status))
        }
    }

    pub async fn toggle_demo_mode(&self) -> Result<DemoModeResponse, CommandError> {
        let response: DemoModeResponse = self
            .post("toggle_demo_mode", &serde_json::json!({}))
            .await?;
        if response.status == "success" {
            Ok(response)
        } else {
            Err(CommandError::Rejected(response.status))
        }
    }

    pub async fn server_status(&self) -> Result<ServerStatus, CommandError> {
        self.get("status").await
    }

    pub async fn recent_alerts(&self) -> Result<Vec<AlertRaised>, CommandError> {
        self.get("alerts").await
    }
}
