use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::RwLock as SyncRwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use super::base::{
    BaseSTT, RecognitionCallback, RecognitionEvent, RecognitionResult, RecognizedWord, STTConfig,
    STTError, STTErrorCallback, STTStats,
};

const DEEPGRAM_LISTEN_URL: &str = "wss://api.deepgram.com/v1/listen";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const KEEP_ALIVE_MESSAGE: &str = r#"{"type":"KeepAlive"}"#;
const CLOSE_STREAM_MESSAGE: &str = r#"{"type":"CloseStream"}"#;

/// Messages on the Deepgram live transcription socket, keyed by their `type` field
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum DeepgramMessage {
    Results(DeepgramResults),
    UtteranceEnd(DeepgramUtteranceEnd),
    Metadata(DeepgramMetadata),
    Error(DeepgramError),
    /// SpeechStarted and anything newer than this client
    #[serde(other)]
    Other,
}

/// Deepgram transcription result
#[derive(Debug, Deserialize, Serialize)]
pub struct DeepgramResults {
    pub channel: DeepgramChannel,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub speech_final: bool,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub start: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeepgramChannel {
    pub alternatives: Vec<DeepgramAlternative>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeepgramAlternative {
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub words: Vec<DeepgramWord>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeepgramWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub confidence: f32,
    pub punctuated_word: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeepgramUtteranceEnd {
    pub last_word_end: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeepgramMetadata {
    pub request_id: Option<String>,
    pub created: Option<String>,
    pub duration: Option<f64>,
    pub channels: Option<u32>,
    pub model_uuid: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeepgramError {
    pub description: Option<String>,
    pub message: Option<String>,
    pub variant: Option<String>,
}

impl DeepgramResults {
    /// First alternative as a recognition result; `None` when Deepgram sent no alternatives.
    pub fn into_recognition_result(self) -> Option<RecognitionResult> {
        let alternative = self.channel.alternatives.into_iter().next()?;
        Some(RecognitionResult {
            transcript: alternative.transcript,
            is_final: self.is_final,
            speech_final: self.speech_final,
            start: self.start,
            duration: self.duration,
            words: alternative
                .words
                .into_iter()
                .map(|w| RecognizedWord::new(w.word, w.start, w.end))
                .collect(),
        })
    }
}

/// Build the live transcription URL with query parameters
pub fn build_websocket_url(config: &STTConfig) -> Result<String, STTError> {
    let mut url = Url::parse(DEEPGRAM_LISTEN_URL)
        .map_err(|e| STTError::ConfigurationError(format!("Invalid WebSocket URL: {e}")))?;

    {
        let mut query_pairs = url.query_pairs_mut();

        query_pairs.append_pair("model", &config.model);
        query_pairs.append_pair("language", &config.language);
        query_pairs.append_pair("smart_format", &config.smart_format.to_string());
        query_pairs.append_pair("interim_results", &config.interim_results.to_string());
        query_pairs.append_pair("no_delay", "true");

        if let Some(endpointing) = config.endpointing_ms {
            query_pairs.append_pair("endpointing", &endpointing.to_string());
        }

        if let Some(utterance_end) = config.utterance_end_ms {
            query_pairs.append_pair("utterance_end_ms", &utterance_end.to_string());
        }

        if let Some(encoding) = &config.encoding {
            query_pairs.append_pair("encoding", encoding);
        }

        if let Some(sample_rate) = config.sample_rate {
            query_pairs.append_pair("sample_rate", &sample_rate.to_string());
        }
    }

    Ok(url.to_string())
}

/// Deepgram STT WebSocket client
pub struct DeepgramSTT {
    config: Option<STTConfig>,
    stats: Arc<RwLock<STTStats>>,
    /// Outgoing frames for the connection task
    ws_sender: Option<mpsc::UnboundedSender<Message>>,
    shutdown_tx: Option<broadcast::Sender<()>>,
    event_callback: Arc<SyncRwLock<Option<RecognitionCallback>>>,
    error_callback: Arc<SyncRwLock<Option<STTErrorCallback>>>,
    connection_handle: Option<tokio::task::JoinHandle<()>>,
}

impl DeepgramSTT {
    /// Translate one socket frame into a recognition event.
    ///
    /// Returns `Ok(None)` for frames that carry nothing for the session. A close
    /// frame or an `Error` message ends the connection.
    pub fn handle_websocket_message(message: Message) -> Result<Option<RecognitionEvent>, STTError> {
        match message {
            Message::Text(text) => {
                debug!("Received text message: {}", text.as_str());

                let parsed: DeepgramMessage = serde_json::from_str(&text).map_err(|e| {
                    STTError::ProviderError(format!("Failed to parse response: {e}"))
                })?;

                match parsed {
                    DeepgramMessage::Results(results) => {
                        let result = results.into_recognition_result();
                        if result.is_none() {
                            warn!("Deepgram result without alternatives");
                        }
                        Ok(result.map(RecognitionEvent::Result))
                    }
                    DeepgramMessage::UtteranceEnd(end) => Ok(Some(RecognitionEvent::UtteranceEnd {
                        last_word_end: end.last_word_end,
                    })),
                    DeepgramMessage::Metadata(metadata) => {
                        info!(
                            "Deepgram stream metadata: request_id={:?} model_uuid={:?}",
                            metadata.request_id, metadata.model_uuid
                        );
                        Ok(None)
                    }
                    DeepgramMessage::Error(err) => {
                        let description = err
                            .description
                            .or(err.message)
                            .unwrap_or_else(|| "Unknown error from Deepgram".to_string());
                        Err(STTError::ProviderError(format!("Error: {description}")))
                    }
                    DeepgramMessage::Other => {
                        debug!("Ignoring Deepgram message");
                        Ok(None)
                    }
                }
            }
            Message::Binary(data) => {
                warn!("Unexpected binary message from Deepgram: {} bytes", data.len());
                Ok(None)
            }
            Message::Close(close_frame) => {
                info!("WebSocket connection closed: {:?}", close_frame);
                let reason = close_frame
                    .map(|frame| format!("{} {}", frame.code, frame.reason.as_str()))
                    .unwrap_or_else(|| "closed by Deepgram".to_string());
                Err(STTError::ConnectionClosed(reason))
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Ok(None),
        }
    }

    /// Open the socket and spawn the task that pumps frames in both directions.
    async fn start_connection(&mut self, config: STTConfig) -> Result<(), STTError> {
        let ws_url = build_websocket_url(&config)?;

        let mut request = ws_url
            .into_client_request()
            .map_err(|e| STTError::ConfigurationError(format!("Invalid request: {e}")))?;
        let auth = HeaderValue::from_str(&format!("token {}", config.api_key))
            .map_err(|e| STTError::AuthenticationFailed(format!("Invalid API key: {e}")))?;
        request.headers_mut().insert("Authorization", auth);

        let ws_stream = match timeout(CONNECT_TIMEOUT, connect_async(request)).await {
            Ok(Ok((stream, _))) => stream,
            Ok(Err(e)) => {
                error!("Failed to connect to Deepgram: {}", e);
                return Err(STTError::ConnectionFailed(format!(
                    "Failed to connect to Deepgram: {e}"
                )));
            }
            Err(_) => return Err(STTError::ConnectionFailed("Connection timeout".to_string())),
        };

        info!("Connected to Deepgram WebSocket");

        let (ws_tx, mut ws_rx) = mpsc::unbounded_channel::<Message>();
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        self.ws_sender = Some(ws_tx);
        self.shutdown_tx = Some(shutdown_tx);

        let stats = self.stats.clone();
        let event_callback = self.event_callback.clone();
        let error_callback = self.error_callback.clone();

        let connection_handle = tokio::spawn(async move {
            let (mut ws_sink, mut ws_stream) = ws_stream.split();

            let outcome: Result<(), STTError> = loop {
                tokio::select! {
                    Some(message) = ws_rx.recv() => {
                        if let Err(e) = ws_sink.send(message).await {
                            error!("Failed to send WebSocket message: {}", e);
                            break Err(STTError::NetworkError(e.to_string()));
                        }
                    }

                    message = ws_stream.next() => {
                        match message {
                            Some(Ok(msg)) => match Self::handle_websocket_message(msg) {
                                Ok(Some(event)) => {
                                    stats.write().await.update_with_event(&event);
                                    let callback = event_callback.read().clone();
                                    if let Some(callback) = callback {
                                        callback(event).await;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    error!("Deepgram stream error: {}", e);
                                    break Err(e);
                                }
                            },
                            Some(Err(e)) => {
                                error!("WebSocket error: {}", e);
                                break Err(STTError::NetworkError(e.to_string()));
                            }
                            None => {
                                info!("WebSocket stream ended");
                                break Err(STTError::ConnectionClosed("stream ended".to_string()));
                            }
                        }
                    }

                    _ = shutdown_rx.recv() => {
                        debug!("Received shutdown signal");
                        let _ = ws_sink.send(Message::Text(CLOSE_STREAM_MESSAGE.into())).await;
                        let _ = ws_sink.close().await;
                        break Ok(());
                    }
                }
            };

            info!("Deepgram WebSocket connection closed");

            if let Err(e) = outcome {
                let callback = error_callback.read().clone();
                if let Some(callback) = callback {
                    callback(e).await;
                }
            }
        });

        self.connection_handle = Some(connection_handle);
        Ok(())
    }

    fn send_frame(&self, message: Message) -> Result<(), STTError> {
        let ws_sender = self
            .ws_sender
            .as_ref()
            .ok_or_else(|| STTError::ConnectionFailed("Not connected to Deepgram".to_string()))?;
        ws_sender
            .send(message)
            .map_err(|e| STTError::NetworkError(format!("Failed to queue frame: {e}")))
    }

}

impl Default for DeepgramSTT {
    fn default() -> Self {
        Self {
            config: None,
            stats: Arc::new(RwLock::new(STTStats::default())),
            ws_sender: None,
            shutdown_tx: None,
            event_callback: Arc::new(SyncRwLock::new(None)),
            error_callback: Arc::new(SyncRwLock::new(None)),
            connection_handle: None,
        }
    }
}

#[async_trait::async_trait]
impl BaseSTT for DeepgramSTT {
    fn new(config: STTConfig) -> Result<Self, STTError> {
        if config.api_key.is_empty() {
            return Err(STTError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        Ok(Self {
            config: Some(config),
            stats: Arc::new(RwLock::new(STTStats::default())),
            ws_sender: None,
            shutdown_tx: None,
            event_callback: Arc::new(SyncRwLock::new(None)),
            error_callback: Arc::new(SyncRwLock::new(None)),
            connection_handle: None,
        })
    }

    async fn connect(&mut self) -> Result<(), STTError> {
        let config = self.config.clone().ok_or_else(|| {
            STTError::ConfigurationError("No configuration available".to_string())
        })?;

        if self.is_ready() {
            self.disconnect().await?;
        }
        self.start_connection(config).await?;

        info!("Successfully connected to Deepgram STT");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), STTError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self.connection_handle.take()
            && timeout(Duration::from_secs(5), handle).await.is_err()
        {
            warn!("Deepgram connection task did not stop in time");
        }

        self.ws_sender = None;

        let stats = self.stats.read().await.clone();
        info!(
            audio_bytes = stats.total_audio_bytes,
            results = stats.results_count,
            final_results = stats.final_results_count,
            utterance_ends = stats.utterance_end_count,
            keep_alives = stats.keep_alives_sent,
            "Disconnected from Deepgram STT"
        );
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ws_sender
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }

    async fn send_audio(&mut self, audio_data: Vec<u8>) -> Result<(), STTError> {
        let len = audio_data.len();
        self.send_frame(Message::Binary(audio_data.into()))?;
        self.stats.write().await.total_audio_bytes += len as u64;
        debug!("Sent {} bytes of audio data", len);
        Ok(())
    }

    async fn send_keep_alive(&mut self) -> Result<(), STTError> {
        self.send_frame(Message::Text(KEEP_ALIVE_MESSAGE.into()))?;
        self.stats.write().await.keep_alives_sent += 1;
        debug!("Sent Deepgram keep-alive");
        Ok(())
    }

    async fn on_event(&mut self, callback: RecognitionCallback) -> Result<(), STTError> {
        *self.event_callback.write() = Some(callback);
        Ok(())
    }

    async fn on_error(&mut self, callback: STTErrorCallback) -> Result<(), STTError> {
        *self.error_callback.write() = Some(callback);
        Ok(())
    }

    fn get_config(&self) -> Option<&STTConfig> {
        self.config.as_ref()
    }

    fn get_provider_info(&self) -> &'static str {
        "Deepgram STT WebSocket v1.0"
    }
}

impl Drop for DeepgramSTT {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Option<RecognitionEvent>, STTError> {
        DeepgramSTT::handle_websocket_message(Message::Text(json.to_string().into()))
    }

    #[test]
    fn test_deepgram_stt_creation() {
        let config = STTConfig {
            api_key: "test_key".to_string(),
            ..Default::default()
        };

        let stt = <DeepgramSTT as BaseSTT>::new(config).unwrap();
        assert!(!stt.is_ready());
        assert_eq!(stt.get_provider_info(), "Deepgram STT WebSocket v1.0");
    }

    #[test]
    fn test_deepgram_stt_requires_api_key() {
        let result = <DeepgramSTT as BaseSTT>::new(STTConfig::default());
        match result {
            Err(STTError::AuthenticationFailed(msg)) => {
                assert!(msg.contains("API key is required"))
            }
            _ => panic!("Expected AuthenticationFailed error"),
        }
    }

    #[test]
    fn test_deepgram_url_building() {
        let config = STTConfig {
            api_key: "test_key".to_string(),
            utterance_end_ms: Some(1000),
            ..Default::default()
        };

        let url = build_websocket_url(&config).unwrap();
        assert!(url.starts_with("wss://api.deepgram.com/v1/listen?"));
        assert!(url.contains("model=nova"));
        assert!(url.contains("language=en-US"));
        assert!(url.contains("smart_format=true"));
        assert!(url.contains("interim_results=true"));
        assert!(url.contains("endpointing=500"));
        assert!(url.contains("no_delay=true"));
        assert!(url.contains("utterance_end_ms=1000"));
        assert!(!url.contains("sample_rate"));
        assert!(!url.contains("test_key"));
    }

    #[test]
    fn test_deepgram_url_raw_audio() {
        let config = STTConfig {
            endpointing_ms: None,
            encoding: Some("linear16".to_string()),
            sample_rate: Some(16000),
            ..Default::default()
        };

        let url = build_websocket_url(&config).unwrap();
        assert!(url.contains("encoding=linear16"));
        assert!(url.contains("sample_rate=16000"));
        assert!(!url.contains("endpointing"));
        assert!(!url.contains("utterance_end_ms"));
    }

    #[test]
    fn test_results_parsing() {
        let json = r#"
        {
            "type": "Results",
            "channel_index": [0, 1],
            "duration": 0.8,
            "start": 1.0,
            "is_final": true,
            "speech_final": true,
            "channel": {
                "alternatives": [
                    {
                        "transcript": "code A1B2C3",
                        "confidence": 0.98,
                        "words": [
                            {"word": "code", "start": 1.0, "end": 1.2, "confidence": 0.99, "punctuated_word": "Code"},
                            {"word": "a1b2c3", "start": 1.2, "end": 1.7, "confidence": 0.91, "punctuated_word": "A1B2C3"}
                        ]
                    }
                ]
            },
            "metadata": {"request_id": "abc"}
        }
        "#;

        let Some(RecognitionEvent::Result(result)) = parse(json).unwrap() else {
            panic!("Expected a recognition result");
        };
        assert_eq!(result.transcript, "code A1B2C3");
        assert!(result.is_final);
        assert!(result.speech_final);
        assert_eq!(result.start, 1.0);
        assert_eq!(result.duration, 0.8);
        assert_eq!(result.words.len(), 2);
        assert_eq!(result.words[1], RecognizedWord::new("a1b2c3", 1.2, 1.7));
    }

    #[test]
    fn test_interim_results_without_words() {
        let json = r#"{"type":"Results","start":0.0,"duration":0.5,"is_final":false,
            "channel":{"alternatives":[{"transcript":"turn","confidence":0.7}]}}"#;

        let Some(RecognitionEvent::Result(result)) = parse(json).unwrap() else {
            panic!("Expected a recognition result");
        };
        assert!(!result.is_final);
        assert!(!result.speech_final);
        assert!(result.words.is_empty());
    }

    #[test]
    fn test_results_without_alternatives_are_skipped() {
        let json = r#"{"type":"Results","is_final":true,"channel":{"alternatives":[]}}"#;
        assert_eq!(parse(json).unwrap(), None);
    }

    #[test]
    fn test_utterance_end_parsing() {
        let json = r#"{"type":"UtteranceEnd","channel":[0,1],"last_word_end":2.395}"#;
        assert_eq!(
            parse(json).unwrap(),
            Some(RecognitionEvent::UtteranceEnd {
                last_word_end: Some(2.395)
            })
        );
    }

    #[test]
    fn test_metadata_and_unknown_messages_are_ignored() {
        let metadata = r#"{"type":"Metadata","request_id":"r-1","model_uuid":"m-1","channels":1}"#;
        assert_eq!(parse(metadata).unwrap(), None);

        let speech_started = r#"{"type":"SpeechStarted","channel":[0,1],"timestamp":1.2}"#;
        assert_eq!(parse(speech_started).unwrap(), None);
    }

    #[test]
    fn test_error_message() {
        let json = r#"{"type":"Error","description":"Invalid API key","message":"bad auth","variant":"auth"}"#;
        match parse(json) {
            Err(STTError::ProviderError(msg)) => {
                assert!(msg.contains("Error"));
                assert!(msg.contains("Invalid API key"));
            }
            other => panic!("Expected ProviderError, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse("not json"),
            Err(STTError::ProviderError(_))
        ));
    }

    #[test]
    fn test_close_frame_reports_connection_closed() {
        let result = DeepgramSTT::handle_websocket_message(Message::Close(None));
        assert!(matches!(result, Err(STTError::ConnectionClosed(_))));
    }

    #[tokio::test]
    async fn test_send_without_connection_fails() {
        let mut stt = <DeepgramSTT as BaseSTT>::new(STTConfig {
            api_key: "test_key".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert!(matches!(
            stt.send_audio(vec![0u8; 16]).await,
            Err(STTError::ConnectionFailed(_))
        ));
        assert!(stt.send_keep_alive().await.is_err());
        // Disconnecting an idle client is a no-op.
        assert!(stt.disconnect().await.is_ok());
        assert_eq!(stt.stats.read().await.total_audio_bytes, 0);
    }
}
