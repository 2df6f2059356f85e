//! Generic HTTP agent.
//!
//! POSTs `{"session_id", "text"}` as JSON and expects `{"text", "audio"?}` back,
//! with `audio` base64 encoded.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::base::{AgentError, AgentReply, ResponseEngine, send_json};

#[derive(Debug, Serialize)]
struct WebhookRequest<'a> {
    session_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct WebhookResponse {
    #[serde(default)]
    text: String,
    audio: Option<String>,
}

impl TryFrom<WebhookResponse> for AgentReply {
    type Error = AgentError;

    fn try_from(response: WebhookResponse) -> Result<Self, Self::Error> {
        let audio = response
            .audio
            .filter(|audio| !audio.is_empty())
            .map(|encoded| BASE64.decode(encoded))
            .transpose()
            .map_err(|e| AgentError::InvalidResponse(format!("audio is not base64: {e}")))?
            .map(Bytes::from);

        Ok(AgentReply {
            text: response.text,
            audio,
        })
    }
}

pub struct WebhookEngine {
    url: String,
    http: reqwest::Client,
}

impl WebhookEngine {
    pub fn new(url: impl Into<String>) -> Result<Self, AgentError> {
        let url = url.into();
        url::Url::parse(&url)
            .map_err(|e| AgentError::Configuration(format!("Invalid webhook URL '{url}': {e}")))?;

        Ok(Self {
            url,
            http: reqwest::Client::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl ResponseEngine for WebhookEngine {
    async fn submit_utterance(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<AgentReply, AgentError> {
        debug!("Posting utterance for session {} to {}", session_id, self.url);

        let request = self
            .http
            .post(&self.url)
            .json(&WebhookRequest { session_id, text });
        let response: WebhookResponse = send_json(request).await?;
        AgentReply::try_from(response)
    }

    fn provider_name(&self) -> &'static str {
        "webhook"
    }
}
