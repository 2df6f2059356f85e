//! Messages flowing into and out of a session

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::agent::{AgentError, AgentReply};
use crate::core::stt::{RecognitionEvent, STTError};
use crate::core::turn::TurnId;

/// Events a session reports to its client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Live transcript fragment
    TranscriptPartial { text: String, is_final: bool },
    /// The user's utterance was accepted and sent to the agent
    UtteranceComplete,
    /// The agent answered; `audio` is base64 on the wire
    BotReply {
        text: String,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            with = "base64_audio"
        )]
        audio: Option<Bytes>,
    },
    /// The agent could not answer; the session keeps listening
    TurnFailed { reason: String },
    /// The session ended with an unrecoverable error
    Error { message: String },
}

impl ServerEvent {
    /// Whether the session stops after this event.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ServerEvent::Error { .. })
    }
}

impl From<AgentReply> for ServerEvent {
    fn from(reply: AgentReply) -> Self {
        ServerEvent::BotReply {
            text: reply.text,
            audio: reply.audio,
        }
    }
}

mod base64_audio {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(audio: &Option<Bytes>, serializer: S) -> Result<S::Ok, S::Error> {
        match audio {
            Some(bytes) => serializer.serialize_some(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Bytes>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .filter(|value| !value.is_empty())
            .map(|value| {
                BASE64
                    .decode(value)
                    .map(Bytes::from)
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

/// Work items processed in order by the session task
#[derive(Debug)]
pub(crate) enum SessionEvent {
    Audio(Bytes),
    Recognition {
        generation: u64,
        event: RecognitionEvent,
    },
    ClockTick(f64),
    UpstreamError {
        generation: u64,
        error: STTError,
    },
    Reply {
        turn_id: TurnId,
        result: Result<AgentReply, AgentError>,
    },
    Disconnect,
}
