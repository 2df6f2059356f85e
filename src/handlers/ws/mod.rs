//! # WebSocket Conversation Handler
//!
//! One WebSocket connection is one conversation session.
//!
//! ## Message Types
//!
//! **Incoming Messages:**
//! - **Binary messages** - Encoded microphone audio, forwarded to the recognizer
//! - `{"type": "clock_tick", "stream_time": 2.5}` - Audio clock position in seconds
//! - `{"type": "close"}` - End the conversation
//!
//! **Outgoing Messages:**
//! - `{"type": "transcript_partial", "text": "turn on", "is_final": false}` - Live transcript
//! - `{"type": "utterance_complete"}` - The utterance was sent to the agent
//! - `{"type": "bot_reply", "text": "...", "audio": "base64"}` - Agent reply; `audio` is optional
//! - `{"type": "turn_failed", "reason": "..."}` - The agent could not answer; keep talking
//! - `{"type": "error", "message": "..."}` - Fatal; the server closes the socket afterwards

mod error;
mod handler;
mod messages;

#[cfg(test)]
mod tests;

pub use error::{WebSocketError, WebSocketResult};
pub use handler::ws_voice_handler;
pub use messages::IncomingMessage;
