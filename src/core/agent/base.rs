use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::core::providers::google::GoogleError;

/// The agent's answer to one utterance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentReply {
    pub text: String,
    /// Encoded speech for `text`, when the agent synthesizes audio.
    pub audio: Option<Bytes>,
}

impl AgentReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            audio: None,
        }
    }

    pub fn with_audio(mut self, audio: impl Into<Bytes>) -> Self {
        self.audio = Some(audio.into());
        self
    }
}

/// Error types for response engine calls
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("No reply within {0:?}")]
    Timeout(Duration),
    #[error("Agent API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid agent response: {0}")]
    InvalidResponse(String),
}

impl From<GoogleError> for AgentError {
    fn from(e: GoogleError) -> Self {
        match e {
            GoogleError::AuthenticationFailed(msg) => AgentError::Authentication(msg),
            GoogleError::ConfigurationError(msg) => AgentError::Configuration(msg),
        }
    }
}

/// A conversational agent that answers completed user utterances.
#[async_trait::async_trait]
pub trait ResponseEngine: Send + Sync {
    /// Submit one utterance for the conversation identified by `session_id`.
    ///
    /// A session has at most one call it is waiting on. A call abandoned after an
    /// upstream reconnect may still be running when the next one starts.
    async fn submit_utterance(&self, session_id: &str, text: &str)
    -> Result<AgentReply, AgentError>;

    fn provider_name(&self) -> &'static str;
}

/// Send a JSON request and decode a JSON response, mapping HTTP failures.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, AgentError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            AgentError::Network(format!("Request timed out: {e}"))
        } else {
            AgentError::Network(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(match status.as_u16() {
            401 | 403 => AgentError::Authentication(format!("HTTP {status}: {body}")),
            code => AgentError::Api {
                status: code,
                message: body,
            },
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AgentError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_errors_map_to_agent_errors() {
        assert_eq!(
            AgentError::from(GoogleError::AuthenticationFailed("expired".to_string())),
            AgentError::Authentication("expired".to_string())
        );
        assert_eq!(
            AgentError::from(GoogleError::ConfigurationError("no file".to_string())),
            AgentError::Configuration("no file".to_string())
        );
    }

    #[test]
    fn test_error_display() {
        let err = AgentError::Api {
            status: 500,
            message: "backend down".to_string(),
        };
        assert_eq!(err.to_string(), "Agent API error (500): backend down");
        assert_eq!(
            AgentError::Timeout(Duration::from_secs(15)).to_string(),
            "No reply within 15s"
        );
    }

    #[test]
    fn test_reply_builders() {
        let reply = AgentReply::text("hi").with_audio(vec![1u8, 2, 3]);
        assert_eq!(reply.text, "hi");
        assert_eq!(reply.audio.as_deref(), Some(&[1u8, 2, 3][..]));
    }
}
