//! Google Cloud credentials for REST APIs.
//!
//! Credentials come from one configuration string:
//!
//! - empty: Application Default Credentials (`GOOGLE_APPLICATION_CREDENTIALS`,
//!   the GCP metadata server or `gcloud auth application-default login`)
//! - a string starting with `{`: inline service account JSON
//! - anything else: path to a service account or authorized user JSON file
//!
//! [`TokenProvider`] hands out bearer tokens; the underlying credentials cache
//! and refresh them.

pub mod auth;
pub mod error;

pub use auth::{CredentialSource, GoogleAuthClient, TokenProvider};
pub use error::GoogleError;

#[cfg(test)]
pub use auth::MockTokenProvider;

/// OAuth2 scope granting access to all Google Cloud APIs, Dialogflow included.
pub const GOOGLE_CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
