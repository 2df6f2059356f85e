//! Client-side view of a conversation.

use tracing::{debug, warn};

use super::ClientError;
use super::playback::{AudioPlayer, PlaybackInterruptController};
use crate::core::session::ServerEvent;
use crate::core::turn::UtteranceBuffer;

/// What changed in the view after a server event.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    /// Live transcript to display
    Transcript(String),
    /// The user's utterance was accepted
    UtteranceComplete(String),
    /// The agent answered; `playing` tells whether audio started
    Reply { text: String, playing: bool },
    TurnFailed(String),
}

/// Folds server events into display text and drives reply playback.
pub struct ConversationView<P: AudioPlayer> {
    player: P,
    playback: PlaybackInterruptController<P::Handle>,
    transcript: UtteranceBuffer,
}

impl<P: AudioPlayer> ConversationView<P> {
    pub fn new(player: P) -> Self {
        Self {
            player,
            playback: PlaybackInterruptController::new(),
            transcript: UtteranceBuffer::new(),
        }
    }

    /// Current transcript: finalized text followed by tentative text.
    pub fn transcript(&self) -> String {
        self.transcript.combined()
    }

    pub fn playback(&self) -> &PlaybackInterruptController<P::Handle> {
        &self.playback
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    /// Apply one JSON text frame from the server.
    pub fn handle_message(&mut self, message: &str) -> Result<ViewUpdate, ClientError> {
        let event: ServerEvent = serde_json::from_str(message)
            .map_err(|e| ClientError::InvalidMessage(e.to_string()))?;
        self.handle_event(event)
    }

    /// Apply one server event. A fatal server error stops playback and is returned as an error.
    pub fn handle_event(&mut self, event: ServerEvent) -> Result<ViewUpdate, ClientError> {
        match event {
            ServerEvent::TranscriptPartial { text, is_final } => {
                self.playback.on_transcript(&text);
                self.transcript.apply_text(&text, is_final);
                Ok(ViewUpdate::Transcript(self.transcript.combined()))
            }
            ServerEvent::UtteranceComplete => {
                if !self.transcript.unfinalized().is_empty() {
                    return Err(ClientError::ProtocolViolation(format!(
                        "utterance completed while '{}' was still tentative",
                        self.transcript.unfinalized()
                    )));
                }
                let text = self.transcript.finalized().to_string();
                self.transcript.reset();
                Ok(ViewUpdate::UtteranceComplete(text))
            }
            ServerEvent::BotReply { text, audio } => {
                let playing = match audio {
                    Some(audio) => {
                        debug!("Starting reply playback ({} bytes)", audio.len());
                        let handle = self.player.play(audio)?;
                        self.playback.on_reply_started(handle);
                        true
                    }
                    None => false,
                };
                Ok(ViewUpdate::Reply { text, playing })
            }
            ServerEvent::TurnFailed { reason } => {
                warn!("Turn failed: {}", reason);
                Ok(ViewUpdate::TurnFailed(reason))
            }
            ServerEvent::Error { message } => {
                self.playback.stop();
                Err(ClientError::Session(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PlaybackHandle;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakePlayer {
        started: Vec<Bytes>,
        stops: Arc<AtomicUsize>,
        fail: bool,
    }

    struct FakeHandle {
        stops: Arc<AtomicUsize>,
    }

    impl PlaybackHandle for FakeHandle {
        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl AudioPlayer for FakePlayer {
        type Handle = FakeHandle;

        fn play(&mut self, audio: Bytes) -> Result<FakeHandle, ClientError> {
            if self.fail {
                return Err(ClientError::Playback("no output device".to_string()));
            }
            self.started.push(audio);
            Ok(FakeHandle {
                stops: self.stops.clone(),
            })
        }
    }

    fn partial(text: &str, is_final: bool) -> ServerEvent {
        ServerEvent::TranscriptPartial {
            text: text.to_string(),
            is_final,
        }
    }

    #[test]
    fn test_transcript_folding() {
        let mut view = ConversationView::new(FakePlayer::default());

        assert_eq!(
            view.handle_event(partial("turn", false)).unwrap(),
            ViewUpdate::Transcript("turn".to_string())
        );
        assert_eq!(
            view.handle_event(partial("turn on", true)).unwrap(),
            ViewUpdate::Transcript("turn on".to_string())
        );
        assert_eq!(
            view.handle_event(partial("the", false)).unwrap(),
            ViewUpdate::Transcript("turn on the".to_string())
        );
        view.handle_event(partial("the lights", true)).unwrap();
        assert_eq!(view.transcript(), "turn on the lights");

        assert_eq!(
            view.handle_event(ServerEvent::UtteranceComplete).unwrap(),
            ViewUpdate::UtteranceComplete("turn on the lights".to_string())
        );
        assert_eq!(view.transcript(), "");
    }

    #[test]
    fn test_utterance_complete_with_tentative_text_is_violation() {
        let mut view = ConversationView::new(FakePlayer::default());
        view.handle_event(partial("hello", true)).unwrap();
        view.handle_event(partial("wor", false)).unwrap();

        assert!(matches!(
            view.handle_event(ServerEvent::UtteranceComplete),
            Err(ClientError::ProtocolViolation(msg)) if msg.contains("'wor'")
        ));
    }

    #[test]
    fn test_reply_audio_plays_and_speech_interrupts_it() {
        let mut view = ConversationView::new(FakePlayer::default());
        let update = view
            .handle_message(r#"{"type":"bot_reply","text":"Hello!","audio":"T2dnUw=="}"#)
            .unwrap();
        assert_eq!(
            update,
            ViewUpdate::Reply {
                text: "Hello!".to_string(),
                playing: true
            }
        );
        assert_eq!(view.player().started, vec![Bytes::from_static(b"OggS")]);
        assert!(view.playback().is_playing());

        view.handle_event(partial("stop", false)).unwrap();
        view.handle_event(partial("stop please", false)).unwrap();
        assert!(!view.playback().is_playing());
        assert_eq!(view.player().stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_text_only_reply() {
        let mut view = ConversationView::new(FakePlayer::default());
        let update = view
            .handle_message(r#"{"type":"bot_reply","text":"Hi"}"#)
            .unwrap();
        assert_eq!(
            update,
            ViewUpdate::Reply {
                text: "Hi".to_string(),
                playing: false
            }
        );
        assert!(!view.playback().is_playing());
    }

    #[test]
    fn test_playback_failure_surfaces() {
        let mut view = ConversationView::new(FakePlayer {
            fail: true,
            ..Default::default()
        });
        let result = view.handle_event(ServerEvent::BotReply {
            text: "Hi".to_string(),
            audio: Some(Bytes::from_static(b"x")),
        });
        assert!(matches!(result, Err(ClientError::Playback(_))));
    }

    #[test]
    fn test_server_error_stops_playback() {
        let mut view = ConversationView::new(FakePlayer::default());
        view.handle_event(ServerEvent::BotReply {
            text: "Long story".to_string(),
            audio: Some(Bytes::from_static(b"audio")),
        })
        .unwrap();

        let result = view.handle_message(r#"{"type":"error","message":"recognizer gone"}"#);
        assert!(matches!(result, Err(ClientError::Session(msg)) if msg == "recognizer gone"));
        assert!(!view.playback().is_playing());
    }

    #[test]
    fn test_turn_failed_and_bad_json() {
        let mut view = ConversationView::new(FakePlayer::default());
        assert_eq!(
            view.handle_message(r#"{"type":"turn_failed","reason":"timeout"}"#)
                .unwrap(),
            ViewUpdate::TurnFailed("timeout".to_string())
        );
        assert!(matches!(
            view.handle_message("not json"),
            Err(ClientError::InvalidMessage(_))
        ));
    }
}
