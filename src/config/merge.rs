use super::ServerConfig;
use super::utils::{env_value, parse_bool};
use super::yaml::YamlConfig;

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. Environment variables
/// 2. YAML configuration values
/// 3. Default values
///
/// Empty environment variables are treated as unset.
///
/// # Arguments
/// * `yaml_config` - Optional YAML configuration providing base values
///
/// # Returns
/// * `Result<ServerConfig, Box<dyn std::error::Error>>` - The merged configuration or an error
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();
    let defaults = ServerConfig::default();

    // Helper macro to get value with priority: ENV > YAML > Default
    macro_rules! get_value {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            env_value($env_var)
                .or($yaml_value)
                .unwrap_or_else(|| $default.to_string())
        };
    }

    // Helper macro for optional values: ENV > YAML
    macro_rules! get_optional {
        ($env_var:expr, $yaml_value:expr) => {
            env_value($env_var).or($yaml_value)
        };
    }

    // Helper macro for parsed values: ENV (parsed) > YAML > Default
    macro_rules! get_parsed {
        ($env_var:expr, $ty:ty, $yaml_value:expr, $default:expr) => {
            match env_value($env_var) {
                Some(raw) => raw.trim().parse::<$ty>().map_err(|e| {
                    format!("Invalid {} environment variable '{}': {e}", $env_var, raw)
                })?,
                None => $yaml_value.unwrap_or($default),
            }
        };
    }

    let server = yaml.server.unwrap_or_default();
    let recognizer = yaml.recognizer.unwrap_or_default();
    let agent = yaml.agent.unwrap_or_default();
    let dialogflow = agent.dialogflow.unwrap_or_default();
    let turn = yaml.turn.unwrap_or_default();

    // Server configuration
    let host = get_value!("HOST", server.host, defaults.host);
    let port = get_parsed!("PORT", u16, server.port, defaults.port);
    let ignored_audio_chunk_bytes = match env_value("IGNORED_AUDIO_CHUNK_BYTES") {
        Some(raw) => Some(raw.trim().parse::<usize>().map_err(|e| {
            format!("Invalid IGNORED_AUDIO_CHUNK_BYTES environment variable '{raw}': {e}")
        })?),
        None => server.ignored_audio_chunk_bytes,
    };

    // Deepgram configuration
    let deepgram_api_key = get_optional!("DEEPGRAM_API_KEY", recognizer.api_key);
    let deepgram_model = get_value!("DEEPGRAM_MODEL", recognizer.model, defaults.deepgram_model);
    let deepgram_language = get_value!(
        "DEEPGRAM_LANGUAGE",
        recognizer.language,
        defaults.deepgram_language
    );
    let deepgram_endpointing_ms = match env_value("DEEPGRAM_ENDPOINTING_MS") {
        Some(raw) => Some(raw.trim().parse::<u32>().map_err(|e| {
            format!("Invalid DEEPGRAM_ENDPOINTING_MS environment variable '{raw}': {e}")
        })?),
        None => recognizer
            .endpointing_ms
            .or(defaults.deepgram_endpointing_ms),
    };
    let deepgram_utterance_end_ms = match env_value("DEEPGRAM_UTTERANCE_END_MS") {
        Some(raw) => Some(raw.trim().parse::<u32>().map_err(|e| {
            format!("Invalid DEEPGRAM_UTTERANCE_END_MS environment variable '{raw}': {e}")
        })?),
        None => recognizer.utterance_end_ms,
    };
    let deepgram_smart_format = match env_value("DEEPGRAM_SMART_FORMAT") {
        Some(raw) => parse_bool(&raw).ok_or_else(|| {
            format!("Invalid DEEPGRAM_SMART_FORMAT environment variable '{raw}': expected a boolean")
        })?,
        None => recognizer
            .smart_format
            .unwrap_or(defaults.deepgram_smart_format),
    };

    // Agent configuration
    let agent_provider = get_value!("AGENT_PROVIDER", agent.provider, defaults.agent_provider);
    let agent_webhook_url = get_optional!("AGENT_WEBHOOK_URL", agent.webhook_url);
    let agent_timeout_seconds = get_parsed!(
        "AGENT_TIMEOUT_SECONDS",
        u64,
        agent.timeout_seconds,
        defaults.agent_timeout_seconds
    );
    let dialogflow_project_id = get_optional!("DIALOGFLOW_PROJECT_ID", dialogflow.project_id);
    let dialogflow_location = get_optional!("DIALOGFLOW_LOCATION", dialogflow.location);
    let dialogflow_agent_id = get_optional!("DIALOGFLOW_AGENT_ID", dialogflow.agent_id);
    let dialogflow_language_code = get_value!(
        "DIALOGFLOW_LANGUAGE_CODE",
        dialogflow.language_code,
        defaults.dialogflow_language_code
    );
    let google_credentials =
        get_optional!("GOOGLE_APPLICATION_CREDENTIALS", dialogflow.credentials);

    // Turn-taking configuration
    let silence_timeout_ms = get_parsed!(
        "SILENCE_TIMEOUT_MS",
        u64,
        turn.silence_timeout_ms,
        defaults.silence_timeout_ms
    );
    let word_duration_clamp_ms = get_parsed!(
        "WORD_DURATION_CLAMP_MS",
        u64,
        turn.word_duration_clamp_ms,
        defaults.word_duration_clamp_ms
    );
    let keepalive_interval_seconds = get_parsed!(
        "KEEPALIVE_INTERVAL_SECONDS",
        u64,
        turn.keepalive_interval_seconds,
        defaults.keepalive_interval_seconds
    );
    let max_upstream_reconnects = get_parsed!(
        "UPSTREAM_MAX_RECONNECTS",
        u32,
        turn.max_upstream_reconnects,
        defaults.max_upstream_reconnects
    );

    Ok(ServerConfig {
        host,
        port,
        ignored_audio_chunk_bytes,
        deepgram_api_key,
        deepgram_model,
        deepgram_language,
        deepgram_endpointing_ms,
        deepgram_utterance_end_ms,
        deepgram_smart_format,
        agent_provider,
        agent_webhook_url,
        agent_timeout_seconds,
        dialogflow_project_id,
        dialogflow_location,
        dialogflow_agent_id,
        dialogflow_language_code,
        google_credentials,
        silence_timeout_ms,
        word_duration_clamp_ms,
        keepalive_interval_seconds,
        max_upstream_reconnects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::yaml::{AgentYaml, DialogflowYaml, RecognizerYaml, ServerYaml, TurnYaml};
    use serial_test::serial;
    use std::env;

    const VARS: &[&str] = &[
        "HOST",
        "PORT",
        "DEEPGRAM_API_KEY",
        "DEEPGRAM_MODEL",
        "DEEPGRAM_LANGUAGE",
        "DEEPGRAM_ENDPOINTING_MS",
        "DEEPGRAM_UTTERANCE_END_MS",
        "DEEPGRAM_SMART_FORMAT",
        "AGENT_PROVIDER",
        "AGENT_WEBHOOK_URL",
        "AGENT_TIMEOUT_SECONDS",
        "DIALOGFLOW_PROJECT_ID",
        "DIALOGFLOW_LOCATION",
        "DIALOGFLOW_AGENT_ID",
        "DIALOGFLOW_LANGUAGE_CODE",
        "GOOGLE_APPLICATION_CREDENTIALS",
        "SILENCE_TIMEOUT_MS",
        "WORD_DURATION_CLAMP_MS",
        "KEEPALIVE_INTERVAL_SECONDS",
        "UPSTREAM_MAX_RECONNECTS",
        "IGNORED_AUDIO_CHUNK_BYTES",
    ];

    fn cleanup_env_vars() {
        for var in VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_yaml_or_env() {
        cleanup_env_vars();

        let config = merge_config(None).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.deepgram_model, "nova");
        assert_eq!(config.deepgram_language, "en-US");
        assert_eq!(config.deepgram_endpointing_ms, Some(500));
        assert_eq!(config.deepgram_utterance_end_ms, None);
        assert!(config.deepgram_smart_format);
        assert_eq!(config.agent_provider, "dialogflow");
        assert_eq!(config.dialogflow_language_code, "en");
        assert_eq!(config.agent_timeout_seconds, 15);
        assert_eq!(config.silence_timeout_ms, 1250);
        assert_eq!(config.word_duration_clamp_ms, 500);
        assert_eq!(config.keepalive_interval_seconds, 8);
        assert_eq!(config.max_upstream_reconnects, 3);
    }

    #[test]
    #[serial]
    fn test_yaml_values_used_when_env_unset() {
        cleanup_env_vars();

        let yaml = YamlConfig {
            server: Some(ServerYaml {
                host: Some("127.0.0.1".to_string()),
                port: Some(8080),
                ..Default::default()
            }),
            recognizer: Some(RecognizerYaml {
                api_key: Some("yaml-key".to_string()),
                utterance_end_ms: Some(1000),
                ..Default::default()
            }),
            agent: Some(AgentYaml {
                provider: Some("dialogflow".to_string()),
                dialogflow: Some(DialogflowYaml {
                    location: Some("us-central1".to_string()),
                    agent_id: Some("agent".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            turn: Some(TurnYaml {
                silence_timeout_ms: Some(900),
                ..Default::default()
            }),
        };

        let config = merge_config(Some(yaml)).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.deepgram_api_key.as_deref(), Some("yaml-key"));
        assert_eq!(config.deepgram_utterance_end_ms, Some(1000));
        assert_eq!(config.dialogflow_location.as_deref(), Some("us-central1"));
        assert_eq!(config.dialogflow_agent_id.as_deref(), Some("agent"));
        assert_eq!(config.silence_timeout_ms, 900);
        assert_eq!(config.keepalive_interval_seconds, 8);
    }

    #[test]
    #[serial]
    fn test_env_overrides_yaml() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "9000");
            env::set_var("DEEPGRAM_API_KEY", "env-key");
            env::set_var("SILENCE_TIMEOUT_MS", "2000");
            env::set_var("DEEPGRAM_SMART_FORMAT", "no");
            env::set_var("AGENT_PROVIDER", "");
        }

        let yaml = YamlConfig {
            server: Some(ServerYaml {
                port: Some(8080),
                ..Default::default()
            }),
            recognizer: Some(RecognizerYaml {
                api_key: Some("yaml-key".to_string()),
                ..Default::default()
            }),
            agent: Some(AgentYaml {
                provider: Some("webhook".to_string()),
                ..Default::default()
            }),
            turn: Some(TurnYaml {
                silence_timeout_ms: Some(900),
                ..Default::default()
            }),
        };

        let config = merge_config(Some(yaml)).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.deepgram_api_key.as_deref(), Some("env-key"));
        assert_eq!(config.silence_timeout_ms, 2000);
        assert!(!config.deepgram_smart_format);
        // Empty env var falls through to YAML
        assert_eq!(config.agent_provider, "webhook");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_numeric_env() {
        cleanup_env_vars();
        unsafe {
            env::set_var("UPSTREAM_MAX_RECONNECTS", "many");
        }

        let err = merge_config(None).unwrap_err();
        assert!(err.to_string().contains("UPSTREAM_MAX_RECONNECTS"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_bool_env() {
        cleanup_env_vars();
        unsafe {
            env::set_var("DEEPGRAM_SMART_FORMAT", "sometimes");
        }

        let err = merge_config(None).unwrap_err();
        assert!(err.to_string().contains("DEEPGRAM_SMART_FORMAT"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_ignored_audio_chunk_size() {
        cleanup_env_vars();
        assert_eq!(merge_config(None).unwrap().ignored_audio_chunk_bytes, None);

        let yaml = YamlConfig {
            server: Some(ServerYaml {
                ignored_audio_chunk_bytes: Some(126),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            merge_config(Some(yaml.clone())).unwrap().ignored_audio_chunk_bytes,
            Some(126)
        );

        unsafe {
            env::set_var("IGNORED_AUDIO_CHUNK_BYTES", "64");
        }
        assert_eq!(
            merge_config(Some(yaml)).unwrap().ignored_audio_chunk_bytes,
            Some(64)
        );

        cleanup_env_vars();
    }
}
