//! Response engines answering completed user utterances.

mod base;
pub mod dialogflow;
pub mod webhook;

use std::sync::Arc;

pub use base::{AgentError, AgentReply, ResponseEngine};
pub use dialogflow::{DialogflowConfig, DialogflowEngine};
pub use webhook::WebhookEngine;

use crate::config::ServerConfig;

/// Supported response engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentProvider {
    /// Dialogflow CX detectIntent
    Dialogflow,
    /// JSON webhook
    Webhook,
}

impl std::fmt::Display for AgentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentProvider::Dialogflow => write!(f, "dialogflow"),
            AgentProvider::Webhook => write!(f, "webhook"),
        }
    }
}

impl std::str::FromStr for AgentProvider {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dialogflow" | "dialogflow-cx" => Ok(AgentProvider::Dialogflow),
            "webhook" => Ok(AgentProvider::Webhook),
            _ => Err(AgentError::Configuration(format!(
                "Unsupported agent provider: {s}. Supported providers: dialogflow, webhook"
            ))),
        }
    }
}

/// Build the response engine selected by the server configuration.
pub fn create_response_engine(
    config: &ServerConfig,
) -> Result<Arc<dyn ResponseEngine>, AgentError> {
    match config.agent_provider.parse::<AgentProvider>()? {
        AgentProvider::Dialogflow => {
            let required = |value: &Option<String>, name: &str| {
                value.clone().ok_or_else(|| {
                    AgentError::Configuration(format!("{name} is required for Dialogflow"))
                })
            };
            let dialogflow = DialogflowConfig {
                project_id: config.dialogflow_project_id.clone().unwrap_or_default(),
                location: required(&config.dialogflow_location, "DIALOGFLOW_LOCATION")?,
                agent_id: required(&config.dialogflow_agent_id, "DIALOGFLOW_AGENT_ID")?,
                language_code: config.dialogflow_language_code.clone(),
                credentials: config.google_credentials.clone().unwrap_or_default(),
            };
            Ok(Arc::new(DialogflowEngine::new(dialogflow)?))
        }
        AgentProvider::Webhook => {
            let url = config.agent_webhook_url.clone().ok_or_else(|| {
                AgentError::Configuration("AGENT_WEBHOOK_URL is required for webhook".to_string())
            })?;
            Ok(Arc::new(WebhookEngine::new(url)?))
        }
    }
}
