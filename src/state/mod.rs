use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::agent::{AgentError, ResponseEngine, create_response_engine};
use crate::core::session::SessionConfig;
use crate::core::stt::{STTProviderFactory, default_stt_factory};

/// Application state that can be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    /// Settings every new session starts with
    pub session_config: SessionConfig,
    /// Builds one recognizer per session
    pub stt_factory: STTProviderFactory,
    /// Shared by all sessions
    pub response_engine: Arc<dyn ResponseEngine>,
}

impl AppState {
    /// Build the production state: Deepgram recognizers and the configured agent.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, AgentError> {
        let response_engine = create_response_engine(&config)?;
        Ok(Self::with_providers(
            config,
            default_stt_factory(),
            response_engine,
        ))
    }

    /// Build state around explicit providers.
    pub fn with_providers(
        config: ServerConfig,
        stt_factory: STTProviderFactory,
        response_engine: Arc<dyn ResponseEngine>,
    ) -> Arc<Self> {
        let session_config = SessionConfig::from_server_config(&config);
        Arc::new(Self {
            config,
            session_config,
            stt_factory,
            response_engine,
        })
    }
}
