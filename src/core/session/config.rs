//! Per-session runtime settings

use std::time::Duration;

use crate::config::ServerConfig;
use crate::core::stt::STTConfig;
use crate::core::turn::TurnConfig;

/// Base delay before an upstream reconnect; multiplied by the attempt number.
pub const DEFAULT_RECONNECT_BACKOFF_MS: u64 = 250;

/// Settings every conversation session is started with
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub turn: TurnConfig,
    pub stt: STTConfig,
    /// Interval between recognizer keep-alive messages
    pub keepalive_interval: Duration,
    /// Upper bound on one response engine call
    pub reply_timeout: Duration,
    /// Reconnect attempts allowed before the session gives up on the recognizer
    pub max_upstream_reconnects: u32,
    pub reconnect_backoff: Duration,
    /// Audio chunks of exactly this many bytes are dropped. Browser MediaRecorder
    /// streams emit a container fragment of a fixed size that recognizers reject.
    pub ignored_audio_chunk_bytes: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn: TurnConfig::default(),
            stt: STTConfig::default(),
            keepalive_interval: Duration::from_secs(8),
            reply_timeout: Duration::from_secs(15),
            max_upstream_reconnects: 3,
            reconnect_backoff: Duration::from_millis(DEFAULT_RECONNECT_BACKOFF_MS),
            ignored_audio_chunk_bytes: None,
        }
    }
}

impl SessionConfig {
    /// Derive session settings from the server configuration.
    ///
    /// A missing Deepgram key is passed through as empty; the recognizer rejects
    /// it when the session starts.
    pub fn from_server_config(config: &ServerConfig) -> Self {
        let stt = STTConfig {
            api_key: config.deepgram_api_key.clone().unwrap_or_default(),
            model: config.deepgram_model.clone(),
            language: config.deepgram_language.clone(),
            endpointing_ms: config.deepgram_endpointing_ms,
            utterance_end_ms: config.deepgram_utterance_end_ms,
            interim_results: true,
            smart_format: config.deepgram_smart_format,
            encoding: None,
            sample_rate: None,
        };

        Self {
            turn: TurnConfig::from_millis(config.silence_timeout_ms, config.word_duration_clamp_ms),
            stt,
            keepalive_interval: config.keepalive_interval(),
            reply_timeout: config.agent_timeout(),
            max_upstream_reconnects: config.max_upstream_reconnects,
            reconnect_backoff: Duration::from_millis(DEFAULT_RECONNECT_BACKOFF_MS),
            ignored_audio_chunk_bytes: config.ignored_audio_chunk_bytes,
        }
    }
}
