//! Dialogflow CX agent over the REST `detectIntent` API.
//!
//! Each conversation session maps onto a Dialogflow session with the same id, so
//! the agent keeps its page and parameter state across turns. Replies carry the
//! agent's text messages and Ogg/Opus speech synthesized by Dialogflow.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::base::{AgentError, AgentReply, ResponseEngine, send_json};
use crate::core::providers::google::{
    CredentialSource, GOOGLE_CLOUD_PLATFORM_SCOPE, GoogleAuthClient, TokenProvider,
};

const OUTPUT_AUDIO_ENCODING: &str = "OUTPUT_AUDIO_ENCODING_OGG_OPUS";
const NO_MATCH: &str = "NONE MATCHED";

/// Location and credentials of a Dialogflow CX agent
#[derive(Debug, Clone, PartialEq)]
pub struct DialogflowConfig {
    pub project_id: String,
    /// Region such as `us-central1`, or `global`
    pub location: String,
    pub agent_id: String,
    pub language_code: String,
    /// Credentials setting: empty for ADC, inline JSON or a file path
    pub credentials: String,
}

impl DialogflowConfig {
    fn api_host(&self) -> String {
        if self.location == "global" {
            "dialogflow.googleapis.com".to_string()
        } else {
            format!("{}-dialogflow.googleapis.com", self.location)
        }
    }

    /// `detectIntent` endpoint for one conversation session.
    pub fn detect_intent_url(&self, session_id: &str) -> String {
        format!(
            "https://{}/v3/projects/{}/locations/{}/agents/{}/sessions/{}:detectIntent",
            self.api_host(),
            self.project_id,
            self.location,
            self.agent_id,
            session_id
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentRequest<'a> {
    query_input: QueryInput<'a>,
    output_audio_config: OutputAudioConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryInput<'a> {
    text: TextInput<'a>,
    language_code: &'a str,
}

#[derive(Debug, Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputAudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    #[serde(default)]
    query_result: QueryResult,
    /// Base64 encoded
    output_audio: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    #[serde(default)]
    response_messages: Vec<ResponseMessage>,
    #[serde(rename = "match")]
    matched: Option<Match>,
    current_page: Option<DisplayNamed>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    #[serde(default)]
    text: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Match {
    intent: Option<DisplayNamed>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisplayNamed {
    #[serde(default)]
    display_name: String,
}

impl DetectIntentResponse {
    fn into_reply(self) -> Result<AgentReply, AgentError> {
        let lines: Vec<String> = self
            .query_result
            .response_messages
            .into_iter()
            .filter_map(|message| message.text)
            .flat_map(|text| text.text)
            .collect();

        let audio = match self.output_audio.filter(|audio| !audio.is_empty()) {
            Some(encoded) => Some(Bytes::from(BASE64.decode(encoded).map_err(|e| {
                AgentError::InvalidResponse(format!("outputAudio is not base64: {e}"))
            })?)),
            None => None,
        };

        Ok(AgentReply {
            text: lines.join("\n\n"),
            audio,
        })
    }
}

/// Dialogflow CX response engine
pub struct DialogflowEngine {
    config: DialogflowConfig,
    http: reqwest::Client,
    token_provider: Arc<dyn TokenProvider>,
}

impl DialogflowEngine {
    /// Load credentials and build the engine. A missing project id is taken from
    /// the credentials when they carry one.
    pub fn new(mut config: DialogflowConfig) -> Result<Self, AgentError> {
        let source = CredentialSource::from_setting(&config.credentials);
        if config.project_id.is_empty() {
            config.project_id = source.project_id().ok_or_else(|| {
                AgentError::Configuration(
                    "Dialogflow project id is not configured and not found in credentials"
                        .to_string(),
                )
            })?;
        }

        let auth = GoogleAuthClient::new(source, &[GOOGLE_CLOUD_PLATFORM_SCOPE])?;
        Ok(Self::with_token_provider(config, Arc::new(auth)))
    }

    pub fn with_token_provider(
        config: DialogflowConfig,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            token_provider,
        }
    }

    pub fn config(&self) -> &DialogflowConfig {
        &self.config
    }

    fn build_request_body<'a>(&'a self, text: &'a str) -> DetectIntentRequest<'a> {
        DetectIntentRequest {
            query_input: QueryInput {
                text: TextInput { text },
                language_code: &self.config.language_code,
            },
            output_audio_config: OutputAudioConfig {
                audio_encoding: OUTPUT_AUDIO_ENCODING,
            },
        }
    }
}

#[async_trait::async_trait]
impl ResponseEngine for DialogflowEngine {
    async fn submit_utterance(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<AgentReply, AgentError> {
        let token = self.token_provider.get_token().await?;

        let request = self
            .http
            .post(self.config.detect_intent_url(session_id))
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .json(&self.build_request_body(text));

        let response: DetectIntentResponse = send_json(request).await?;

        let intent = response
            .query_result
            .matched
            .as_ref()
            .and_then(|m| m.intent.as_ref())
            .map(|intent| intent.display_name.as_str())
            .unwrap_or(NO_MATCH)
            .to_string();
        let page = response
            .query_result
            .current_page
            .as_ref()
            .map(|page| page.display_name.clone())
            .unwrap_or_default();

        let reply = response.into_reply()?;
        info!(
            session_id = %session_id,
            intent = %intent,
            page = %page,
            "Dialogflow agent response: {:?}",
            reply.text
        );
        Ok(reply)
    }

    fn provider_name(&self) -> &'static str {
        "dialogflow-cx"
    }
}
