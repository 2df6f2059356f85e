use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A single recognized word with its timing inside the audio stream (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl RecognizedWord {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// One recognition result from the streaming recognizer.
///
/// `start` and `duration` describe the audio window the result covers, in seconds
/// since the beginning of the stream. Non-final results are tentative and replace
/// each other; final results are committed text for their window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
    /// Recognizer's own end-of-speech signal. Only meaningful on final results.
    pub speech_final: bool,
    pub start: f64,
    pub duration: f64,
    /// Word timings for the window. May be empty.
    pub words: Vec<RecognizedWord>,
}

impl RecognitionResult {
    /// Tentative result, replaced by the next one.
    pub fn interim(transcript: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
            speech_final: false,
            start,
            duration,
            words: Vec::new(),
        }
    }

    /// Committed result with its word timings.
    pub fn finalized(
        transcript: impl Into<String>,
        start: f64,
        duration: f64,
        words: Vec<RecognizedWord>,
    ) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
            speech_final: false,
            start,
            duration,
            words,
        }
    }

    pub fn with_speech_final(mut self) -> Self {
        self.speech_final = true;
        self
    }

    /// Stream time at the end of this result's window.
    pub fn end_time(&self) -> f64 {
        self.start + self.duration
    }

    pub fn last_word(&self) -> Option<&RecognizedWord> {
        self.words.last()
    }
}

/// Everything the recognizer can deliver to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    Result(RecognitionResult),
    /// Recognizer believes the speaker finished, independent of any result.
    UtteranceEnd { last_word_end: Option<f64> },
}

/// Configuration for Speech-to-Text providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct STTConfig {
    /// API key for the STT provider
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// BCP-47 language code (e.g., "en-US")
    pub language: String,
    /// Recognizer-side endpointing window in milliseconds
    pub endpointing_ms: Option<u32>,
    /// Emit utterance-end events after this many milliseconds without words
    pub utterance_end_ms: Option<u32>,
    /// Stream interim (non-final) results
    pub interim_results: bool,
    pub smart_format: bool,
    /// Raw audio encoding. Containerized audio (webm/ogg) is detected by the provider
    /// and needs neither encoding nor sample rate.
    pub encoding: Option<String>,
    pub sample_rate: Option<u32>,
}

impl Default for STTConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "nova".to_string(),
            language: "en-US".to_string(),
            endpointing_ms: Some(500),
            utterance_end_ms: None,
            interim_results: true,
            smart_format: true,
            encoding: None,
            sample_rate: None,
        }
    }
}

/// Error types for STT operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum STTError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Type alias for recognition event callback
pub type RecognitionCallback =
    Arc<dyn Fn(RecognitionEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Type alias for STT error callback
pub type STTErrorCallback =
    Arc<dyn Fn(STTError) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Base trait for streaming Speech-to-Text providers
#[async_trait::async_trait]
pub trait BaseSTT: Send + Sync {
    /// Create a new instance of the STT provider with the given configuration
    fn new(config: STTConfig) -> Result<Self, STTError>
    where
        Self: Sized;

    /// Open the streaming connection. Callbacks registered before or after
    /// connecting stay registered across reconnects.
    async fn connect(&mut self) -> Result<(), STTError>;

    /// Close the streaming connection. Safe to call when already disconnected.
    async fn disconnect(&mut self) -> Result<(), STTError>;

    /// Check if the connection is ready to be used
    fn is_ready(&self) -> bool;

    /// Send an encoded audio chunk for transcription
    async fn send_audio(&mut self, audio_data: Vec<u8>) -> Result<(), STTError>;

    /// Send a provider keep-alive so an idle stream is not closed
    async fn send_keep_alive(&mut self) -> Result<(), STTError>;

    /// Register the callback receiving results and utterance-end events, in
    /// the order the provider produced them
    async fn on_event(&mut self, callback: RecognitionCallback) -> Result<(), STTError>;

    /// Register the callback receiving errors raised after the connection was established.
    /// A dropped connection is reported once as [`STTError::ConnectionClosed`] or as the
    /// error that ended it.
    async fn on_error(&mut self, callback: STTErrorCallback) -> Result<(), STTError>;

    /// Get the current configuration
    fn get_config(&self) -> Option<&STTConfig>;

    /// Get provider-specific information
    fn get_provider_info(&self) -> &'static str;
}

/// Statistics for STT operations
#[derive(Debug, Default, Clone)]
pub struct STTStats {
    /// Total audio bytes forwarded
    pub total_audio_bytes: u64,
    /// Number of recognition results received
    pub results_count: u32,
    /// Number of final results received
    pub final_results_count: u32,
    pub utterance_end_count: u32,
    pub keep_alives_sent: u32,
}

impl STTStats {
    /// Update statistics with a new event
    pub fn update_with_event(&mut self, event: &RecognitionEvent) {
        match event {
            RecognitionEvent::Result(result) => {
                self.results_count += 1;
                if result.is_final {
                    self.final_results_count += 1;
                }
            }
            RecognitionEvent::UtteranceEnd { .. } => self.utterance_end_count += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockSTT {
        config: Option<STTConfig>,
        connected: AtomicBool,
        callback: Option<RecognitionCallback>,
    }

    #[async_trait::async_trait]
    impl BaseSTT for MockSTT {
        fn new(config: STTConfig) -> Result<Self, STTError> {
            Ok(Self {
                config: Some(config),
                connected: AtomicBool::new(false),
                callback: None,
            })
        }

        async fn connect(&mut self) -> Result<(), STTError> {
            self.connected.store(true, Ordering::Relaxed);
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), STTError> {
            self.connected.store(false, Ordering::Relaxed);
            Ok(())
        }

        fn is_ready(&self) -> bool {
            self.connected.load(Ordering::Relaxed)
        }

        async fn send_audio(&mut self, audio_data: Vec<u8>) -> Result<(), STTError> {
            if !self.is_ready() {
                return Err(STTError::ConnectionFailed("Not connected".to_string()));
            }
            if let Some(callback) = &self.callback {
                let text = format!("{} bytes", audio_data.len());
                callback(RecognitionEvent::Result(RecognitionResult::interim(
                    text, 0.0, 0.1,
                )))
                .await;
            }
            Ok(())
        }

        async fn send_keep_alive(&mut self) -> Result<(), STTError> {
            Ok(())
        }

        async fn on_event(&mut self, callback: RecognitionCallback) -> Result<(), STTError> {
            self.callback = Some(callback);
            Ok(())
        }

        async fn on_error(&mut self, _callback: STTErrorCallback) -> Result<(), STTError> {
            Ok(())
        }

        fn get_config(&self) -> Option<&STTConfig> {
            self.config.as_ref()
        }

        fn get_provider_info(&self) -> &'static str {
            "Mock STT"
        }
    }

    #[tokio::test]
    async fn test_mock_stt_delivers_events_through_callback() {
        let mut stt = MockSTT::new(STTConfig::default()).unwrap();
        let received = Arc::new(AtomicUsize::new(0));
        let counter = received.clone();

        stt.on_event(Arc::new(move |event| {
            let counter = counter.clone();
            Box::pin(async move {
                if let RecognitionEvent::Result(result) = event {
                    assert_eq!(result.transcript, "3 bytes");
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
        }))
        .await
        .unwrap();

        assert!(stt.send_audio(vec![1, 2, 3]).await.is_err());
        stt.connect().await.unwrap();
        assert!(stt.is_ready());
        stt.send_audio(vec![1, 2, 3]).await.unwrap();
        assert_eq!(received.load(Ordering::SeqCst), 1);

        stt.disconnect().await.unwrap();
        assert!(!stt.is_ready());
    }

    #[test]
    fn test_default_config_matches_live_defaults() {
        let config = STTConfig::default();
        assert_eq!(config.model, "nova");
        assert_eq!(config.language, "en-US");
        assert_eq!(config.endpointing_ms, Some(500));
        assert!(config.interim_results);
        assert!(config.smart_format);
        assert!(config.utterance_end_ms.is_none());
    }

    #[test]
    fn test_result_helpers() {
        let result = RecognitionResult::finalized(
            "turn on",
            1.5,
            0.75,
            vec![
                RecognizedWord::new("turn", 1.5, 1.8),
                RecognizedWord::new("on", 1.8, 2.1),
            ],
        )
        .with_speech_final();

        assert!(result.is_final);
        assert!(result.speech_final);
        assert_eq!(result.end_time(), 2.25);
        assert_eq!(result.last_word().map(|w| w.text.as_str()), Some("on"));
    }

    #[test]
    fn test_stats_count_events() {
        let mut stats = STTStats::default();
        stats.update_with_event(&RecognitionEvent::Result(RecognitionResult::interim(
            "a", 0.0, 1.0,
        )));
        stats.update_with_event(&RecognitionEvent::Result(RecognitionResult::finalized(
            "a",
            0.0,
            1.0,
            vec![],
        )));
        stats.update_with_event(&RecognitionEvent::UtteranceEnd {
            last_word_end: Some(1.0),
        });

        assert_eq!(stats.results_count, 2);
        assert_eq!(stats.final_results_count, 1);
        assert_eq!(stats.utterance_end_count, 1);
    }
}
