//! Google Cloud API error types.

/// Errors raised while authenticating against Google Cloud.
#[derive(Debug, thiserror::Error)]
pub enum GoogleError {
    /// Credentials were rejected or no token could be obtained
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Credentials are missing, unreadable or malformed
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let auth_err = GoogleError::AuthenticationFailed("Invalid token".to_string());
        assert_eq!(auth_err.to_string(), "Authentication failed: Invalid token");

        let config_err = GoogleError::ConfigurationError("Missing credentials".to_string());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: Missing credentials"
        );
    }
}
