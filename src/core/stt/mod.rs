mod base;
pub mod deepgram;

use std::sync::Arc;

// Re-export public types and traits
pub use base::{
    BaseSTT, RecognitionCallback, RecognitionEvent, RecognitionResult, RecognizedWord, STTConfig,
    STTError, STTErrorCallback, STTStats,
};

// Re-export Deepgram implementation
pub use deepgram::{DeepgramMessage, DeepgramSTT, build_websocket_url};

/// Supported STT providers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum STTProvider {
    /// Deepgram live transcription WebSocket API
    Deepgram,
}

impl std::fmt::Display for STTProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            STTProvider::Deepgram => write!(f, "deepgram"),
        }
    }
}

impl std::str::FromStr for STTProvider {
    type Err = STTError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deepgram" => Ok(STTProvider::Deepgram),
            _ => Err(STTError::ConfigurationError(format!(
                "Unsupported STT provider: {s}. Supported providers: deepgram"
            ))),
        }
    }
}

/// Builds a fresh recognizer for each session.
pub type STTProviderFactory =
    Arc<dyn Fn(STTConfig) -> Result<Box<dyn BaseSTT>, STTError> + Send + Sync>;

/// Create an STT provider instance
pub fn create_stt_provider(
    provider: &str,
    config: STTConfig,
) -> Result<Box<dyn BaseSTT>, STTError> {
    match provider.parse::<STTProvider>()? {
        STTProvider::Deepgram => Ok(Box::new(<DeepgramSTT as BaseSTT>::new(config)?)),
    }
}

/// Factory used in production: every session gets its own Deepgram stream.
pub fn default_stt_factory() -> STTProviderFactory {
    Arc::new(|config| create_stt_provider("deepgram", config))
}
