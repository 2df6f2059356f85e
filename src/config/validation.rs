use super::ServerConfig;

/// Validate that the selected agent provider has the settings it needs
///
/// - `dialogflow`: `DIALOGFLOW_LOCATION` and `DIALOGFLOW_AGENT_ID` (the project id may
///   come from the credentials)
/// - `webhook`: a parseable `AGENT_WEBHOOK_URL`
pub fn validate_agent_config(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    match config.agent_provider.to_lowercase().as_str() {
        "dialogflow" | "dialogflow-cx" => {
            if config.dialogflow_location.is_none() {
                return Err("DIALOGFLOW_LOCATION is required when AGENT_PROVIDER=dialogflow".into());
            }
            if config.dialogflow_agent_id.is_none() {
                return Err("DIALOGFLOW_AGENT_ID is required when AGENT_PROVIDER=dialogflow".into());
            }
        }
        "webhook" => {
            let Some(url) = &config.agent_webhook_url else {
                return Err("AGENT_WEBHOOK_URL is required when AGENT_PROVIDER=webhook".into());
            };
            url::Url::parse(url).map_err(|e| format!("Invalid AGENT_WEBHOOK_URL '{url}': {e}"))?;
        }
        other => {
            return Err(format!(
                "Unsupported AGENT_PROVIDER '{other}'. Supported providers: dialogflow, webhook"
            )
            .into());
        }
    }

    Ok(())
}

/// Validate turn-taking and timeout settings
pub fn validate_timing(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.silence_timeout_ms == 0 {
        return Err("SILENCE_TIMEOUT_MS must be greater than 0".into());
    }
    if config.keepalive_interval_seconds == 0 {
        return Err("KEEPALIVE_INTERVAL_SECONDS must be greater than 0".into());
    }
    if config.agent_timeout_seconds == 0 {
        return Err("AGENT_TIMEOUT_SECONDS must be greater than 0".into());
    }

    Ok(())
}
