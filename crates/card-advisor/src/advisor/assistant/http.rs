use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{AssistantClient, AssistantError, TurnReply, TurnRequest};

/// Assistant reached over HTTP: one JSON `POST` per turn.
#[derive(Debug, Clone)]
pub struct HttpAssistantClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAssistantClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AssistantError::Transport(format!("failed to build client: {err}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AssistantClient for HttpAssistantClient {
    async fn respond(&self, request: &TurnRequest) -> Result<TurnReply, AssistantError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| AssistantError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AssistantError::Transport(err.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "assistant returned an error status");
            return Err(AssistantError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(bytes = body.len(), "assistant reply received");
        TurnReply::from_model_text(&body)
    }
}
