//! Error types for conversation sessions

use crate::core::{stt::STTError, turn::TurnError};

/// Error types for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Turn error: {0}")]
    Turn(#[from] TurnError),
    #[error("STT error: {0}")]
    STT(#[from] STTError),
    #[error("Speech recognizer unavailable after {attempts} reconnect attempts: {last_error}")]
    UpstreamUnavailable { attempts: u32, last_error: STTError },
    #[error("Session closed")]
    Closed,
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
