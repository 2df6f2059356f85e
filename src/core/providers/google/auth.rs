//! Credential loading and access token retrieval.

use std::path::Path;

use google_cloud_auth::credentials::{
    Builder as CredentialsBuilder, CacheableResource, Credentials, service_account, user_account,
};
use http::{Extensions, HeaderMap};
use serde_json::Value;
use tracing::{debug, error};

use super::error::GoogleError;

/// Where Google Cloud credentials are loaded from.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialSource {
    ApplicationDefault,
    /// Inline service account JSON.
    JsonContent(String),
    /// Service account or authorized user JSON file.
    FilePath(String),
}

impl CredentialSource {
    /// Classify a configured credentials string.
    pub fn from_setting(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            CredentialSource::ApplicationDefault
        } else if value.starts_with('{') {
            CredentialSource::JsonContent(value.to_string())
        } else {
            CredentialSource::FilePath(value.to_string())
        }
    }

    /// Check the source can be loaded before building credentials from it.
    pub fn validate(&self) -> Result<(), GoogleError> {
        match self {
            CredentialSource::ApplicationDefault => Ok(()),
            CredentialSource::JsonContent(json) => parse_credentials_json(json).map(|_| ()),
            CredentialSource::FilePath(path) => {
                if path.contains("..") {
                    return Err(GoogleError::ConfigurationError(
                        "Credential file path must not contain '..'".to_string(),
                    ));
                }
                if !Path::new(path).is_file() {
                    return Err(GoogleError::ConfigurationError(format!(
                        "Credential file not found: {path}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Project id recorded in the credentials, if any.
    ///
    /// Application Default Credentials only expose one when
    /// `GOOGLE_APPLICATION_CREDENTIALS` points at a readable JSON file.
    pub fn project_id(&self) -> Option<String> {
        let json = match self {
            CredentialSource::JsonContent(json) => parse_credentials_json(json).ok()?,
            CredentialSource::FilePath(path) => read_credentials_file(path).ok()?,
            CredentialSource::ApplicationDefault => {
                let path = std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok()?;
                read_credentials_file(&path).ok()?
            }
        };
        json.get("project_id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

fn parse_credentials_json(json: &str) -> Result<Value, GoogleError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| GoogleError::ConfigurationError(format!("Invalid credentials JSON: {e}")))?;
    if !value.is_object() {
        return Err(GoogleError::ConfigurationError(
            "Invalid credentials JSON: expected an object".to_string(),
        ));
    }
    Ok(value)
}

fn read_credentials_file(path: &str) -> Result<Value, GoogleError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        GoogleError::ConfigurationError(format!("Failed to read credentials file '{path}': {e}"))
    })?;
    parse_credentials_json(&content)
}

/// Source of OAuth2 bearer tokens.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// A currently valid access token, without the `Bearer ` prefix.
    async fn get_token(&self) -> Result<String, GoogleError>;
}

/// Token provider backed by `google-cloud-auth` credentials.
pub struct GoogleAuthClient {
    credentials: Credentials,
}

impl std::fmt::Debug for GoogleAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleAuthClient").finish_non_exhaustive()
    }
}

impl GoogleAuthClient {
    pub fn new<S: AsRef<str>>(source: CredentialSource, scopes: &[S]) -> Result<Self, GoogleError> {
        source.validate()?;
        let scopes: Vec<String> = scopes.iter().map(|s| s.as_ref().to_string()).collect();

        let credentials = match source {
            CredentialSource::ApplicationDefault => CredentialsBuilder::default()
                .with_scopes(scopes)
                .build()
                .map_err(|e| {
                    error!(error = %e, "Failed to load Application Default Credentials");
                    GoogleError::AuthenticationFailed(format!(
                        "Failed to load Application Default Credentials: {e}"
                    ))
                })?,
            CredentialSource::JsonContent(json) => {
                build_from_json(parse_credentials_json(&json)?, scopes, "inline JSON")?
            }
            CredentialSource::FilePath(path) => {
                build_from_json(read_credentials_file(&path)?, scopes, &path)?
            }
        };

        debug!("Google Cloud credentials loaded");
        Ok(Self { credentials })
    }
}

fn build_from_json(
    json: Value,
    scopes: Vec<String>,
    origin: &str,
) -> Result<Credentials, GoogleError> {
    let kind = json
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    let built = match kind.as_str() {
        "service_account" => service_account::Builder::new(json)
            .with_access_specifier(service_account::AccessSpecifier::from_scopes(scopes))
            .build()
            .map_err(|e| e.to_string()),
        "authorized_user" => user_account::Builder::new(json)
            .with_scopes(scopes)
            .build()
            .map_err(|e| e.to_string()),
        other => {
            return Err(GoogleError::ConfigurationError(format!(
                "Unsupported credential type '{other}' in {origin}; expected 'service_account' or 'authorized_user'"
            )));
        }
    };

    built.map_err(|e| {
        error!(error = %e, origin = %origin, "Failed to load {} credentials", kind);
        GoogleError::AuthenticationFailed(format!(
            "Failed to load {kind} credentials from {origin}: {e}"
        ))
    })
}

fn bearer_token(headers: CacheableResource<HeaderMap>) -> Result<String, GoogleError> {
    let header_map = match headers {
        CacheableResource::New { data, .. } => data,
        CacheableResource::NotModified => {
            return Err(GoogleError::AuthenticationFailed(
                "Credentials returned no token".to_string(),
            ));
        }
    };

    let value = header_map
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| {
            GoogleError::AuthenticationFailed("Credentials returned no Authorization header".to_string())
        })?
        .to_str()
        .map_err(|e| GoogleError::AuthenticationFailed(format!("Invalid Authorization header: {e}")))?;

    value
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| {
            GoogleError::AuthenticationFailed("Authorization header is not a Bearer token".to_string())
        })
}

#[async_trait::async_trait]
impl TokenProvider for GoogleAuthClient {
    async fn get_token(&self) -> Result<String, GoogleError> {
        let headers = self
            .credentials
            .headers(Extensions::new())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch access token");
                GoogleError::AuthenticationFailed(format!("Failed to fetch access token: {e}"))
            })?;
        bearer_token(headers)
    }
}

/// Fixed-answer token provider for tests.
#[cfg(test)]
pub struct MockTokenProvider {
    result: Result<String, String>,
}

#[cfg(test)]
impl MockTokenProvider {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            result: Ok(token.into()),
        }
    }

    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            result: Err(error.into()),
        }
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl TokenProvider for MockTokenProvider {
    async fn get_token(&self) -> Result<String, GoogleError> {
        self.result
            .clone()
            .map_err(GoogleError::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_source_classification() {
        assert_eq!(
            CredentialSource::from_setting(""),
            CredentialSource::ApplicationDefault
        );
        assert_eq!(
            CredentialSource::from_setting("   "),
            CredentialSource::ApplicationDefault
        );
        assert!(matches!(
            CredentialSource::from_setting(r#" {"type": "service_account"}"#),
            CredentialSource::JsonContent(_)
        ));
        assert_eq!(
            CredentialSource::from_setting("/etc/creds.json"),
            CredentialSource::FilePath("/etc/creds.json".to_string())
        );
    }

    #[test]
    fn test_validate_json() {
        assert!(
            CredentialSource::JsonContent(r#"{"type":"service_account"}"#.to_string())
                .validate()
                .is_ok()
        );
        assert!(matches!(
            CredentialSource::JsonContent("{not json".to_string()).validate(),
            Err(GoogleError::ConfigurationError(_))
        ));
        assert!(matches!(
            CredentialSource::JsonContent("[1, 2]".to_string()).validate(),
            Err(GoogleError::ConfigurationError(msg)) if msg.contains("expected an object")
        ));
    }

    #[test]
    fn test_validate_file_path() {
        assert!(matches!(
            CredentialSource::FilePath("../../etc/passwd".to_string()).validate(),
            Err(GoogleError::ConfigurationError(msg)) if msg.contains("'..'")
        ));
        assert!(matches!(
            CredentialSource::FilePath("/nonexistent/creds.json".to_string()).validate(),
            Err(GoogleError::ConfigurationError(msg)) if msg.contains("not found")
        ));

        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert!(CredentialSource::FilePath(path).validate().is_ok());
    }

    #[test]
    fn test_project_id_from_json_and_file() {
        let json = r#"{"type": "service_account", "project_id": "pizza-bot"}"#;
        assert_eq!(
            CredentialSource::from_setting(json).project_id(),
            Some("pizza-bot".to_string())
        );
        assert_eq!(
            CredentialSource::from_setting(r#"{"type": "service_account"}"#).project_id(),
            None
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert_eq!(
            CredentialSource::FilePath(path).project_id(),
            Some("pizza-bot".to_string())
        );
        assert_eq!(
            CredentialSource::FilePath("/nonexistent/creds.json".to_string()).project_id(),
            None
        );
    }

    #[test]
    fn test_unsupported_credential_type() {
        let json = r#"{"type": "external_account"}"#;
        let err = GoogleAuthClient::new(
            CredentialSource::from_setting(json),
            &[crate::core::providers::google::GOOGLE_CLOUD_PLATFORM_SCOPE],
        )
        .unwrap_err();
        assert!(matches!(err, GoogleError::ConfigurationError(msg) if msg.contains("external_account")));
    }

    #[tokio::test]
    async fn test_mock_token_provider() {
        let provider = MockTokenProvider::with_token("ya29.token");
        assert_eq!(provider.get_token().await.unwrap(), "ya29.token");

        let provider = MockTokenProvider::with_error("expired");
        assert!(matches!(
            provider.get_token().await,
            Err(GoogleError::AuthenticationFailed(msg)) if msg == "expired"
        ));
    }
}
