//! Configuration module for the turnwise server
//!
//! This module handles server configuration from various sources: YAML files and
//! environment variables. Environment variables always override YAML values.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use turnwise::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

/// Server configuration
///
/// Contains all configuration needed to run the server:
/// - Server settings (host, port)
/// - Deepgram recognizer settings
/// - Response engine selection and credentials
/// - Turn-taking timing
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Client audio frames of exactly this size are dropped before the recognizer
    pub ignored_audio_chunk_bytes: Option<usize>,

    // Deepgram settings
    pub deepgram_api_key: Option<String>,
    pub deepgram_model: String,
    pub deepgram_language: String,
    pub deepgram_endpointing_ms: Option<u32>,
    /// Unset disables utterance-end events
    pub deepgram_utterance_end_ms: Option<u32>,
    pub deepgram_smart_format: bool,

    // Response engine settings
    pub agent_provider: String,
    pub agent_webhook_url: Option<String>,
    pub agent_timeout_seconds: u64,
    pub dialogflow_project_id: Option<String>,
    pub dialogflow_location: Option<String>,
    pub dialogflow_agent_id: Option<String>,
    pub dialogflow_language_code: String,
    /// Inline JSON or file path; unset uses Application Default Credentials
    pub google_credentials: Option<String>,

    // Turn-taking settings
    pub silence_timeout_ms: u64,
    pub word_duration_clamp_ms: u64,
    pub keepalive_interval_seconds: u64,
    pub max_upstream_reconnects: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ignored_audio_chunk_bytes: None,
            deepgram_api_key: None,
            deepgram_model: "nova".to_string(),
            deepgram_language: "en-US".to_string(),
            deepgram_endpointing_ms: Some(500),
            deepgram_utterance_end_ms: None,
            deepgram_smart_format: true,
            agent_provider: "dialogflow".to_string(),
            agent_webhook_url: None,
            agent_timeout_seconds: 15,
            dialogflow_project_id: None,
            dialogflow_location: None,
            dialogflow_agent_id: None,
            dialogflow_language_code: "en".to_string(),
            google_credentials: None,
            silence_timeout_ms: 1250,
            word_duration_clamp_ms: 500,
            keepalive_interval_seconds: 8,
            max_upstream_reconnects: 3,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides
    ///
    /// Priority order (highest to lowest):
    /// 1. Environment variables
    /// 2. YAML file values
    /// 3. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // No .env loading here: only real environment variables override an explicit file.
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    /// Run all validation rules against the merged configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_agent_config(self)?;
        validation::validate_timing(self)?;
        Ok(())
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get API key for a specific provider
    ///
    /// # Example
    /// ```rust,no_run
    /// use turnwise::config::ServerConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ServerConfig::from_env()?;
    /// let api_key = config.get_api_key("deepgram")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_api_key(&self, provider: &str) -> Result<String, String> {
        match provider.to_lowercase().as_str() {
            "deepgram" => self.deepgram_api_key.as_ref().cloned().ok_or_else(|| {
                "Deepgram API key not configured in server environment".to_string()
            }),
            _ => Err(format!("Unsupported provider: {provider}")),
        }
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_seconds)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_seconds)
    }
}
