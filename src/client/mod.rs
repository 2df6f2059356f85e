//! Receiving-client logic.
//!
//! A client renders the live transcript from `transcript_partial` events and
//! plays reply audio, stopping it as soon as the user speaks again.

mod playback;
mod view;

pub use playback::{AudioPlayer, PlaybackHandle, PlaybackInterruptController};
pub use view::{ConversationView, ViewUpdate};

/// Error types for client-side processing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("Invalid server message: {0}")]
    InvalidMessage(String),
    #[error("Playback failed: {0}")]
    Playback(String),
    #[error("Session error: {0}")]
    Session(String),
}
