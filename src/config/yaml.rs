use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// Every field is optional; environment variables override anything set here.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3000
///   ignored_audio_chunk_bytes: 126
///
/// recognizer:
///   api_key: "your-deepgram-key"
///   model: "nova"
///   language: "en-US"
///   endpointing_ms: 500
///   utterance_end_ms: 1000
///   smart_format: true
///
/// agent:
///   provider: "dialogflow"
///   timeout_seconds: 15
///   dialogflow:
///     project_id: "my-project"
///     location: "us-central1"
///     agent_id: "00000000-0000-0000-0000-000000000000"
///     language_code: "en"
///     credentials: "/secrets/service-account.json"
///
/// turn:
///   silence_timeout_ms: 1250
///   word_duration_clamp_ms: 500
///   keepalive_interval_seconds: 8
///   max_upstream_reconnects: 3
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub recognizer: Option<RecognizerYaml>,
    pub agent: Option<AgentYaml>,
    pub turn: Option<TurnYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ignored_audio_chunk_bytes: Option<usize>,
}

/// Deepgram settings
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RecognizerYaml {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub language: Option<String>,
    pub endpointing_ms: Option<u32>,
    pub utterance_end_ms: Option<u32>,
    pub smart_format: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AgentYaml {
    pub provider: Option<String>,
    pub webhook_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub dialogflow: Option<DialogflowYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DialogflowYaml {
    pub project_id: Option<String>,
    pub location: Option<String>,
    pub agent_id: Option<String>,
    pub language_code: Option<String>,
    /// Service account JSON content or file path; empty for ADC
    pub credentials: Option<String>,
}

/// Turn-taking timing
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TurnYaml {
    pub silence_timeout_ms: Option<u64>,
    pub word_duration_clamp_ms: Option<u64>,
    pub keepalive_interval_seconds: Option<u64>,
    pub max_upstream_reconnects: Option<u32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config file {}: {e}", path.display()))?;

        Ok(config)
    }
}
