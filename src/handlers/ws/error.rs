//! WebSocket error types and handling

use thiserror::Error;

/// WebSocket handler error types
#[derive(Debug, Error)]
pub enum WebSocketError {
    /// Text frame that is not a known client message
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// The conversation session could not be started
    #[error("Failed to start session: {0}")]
    SessionStart(String),

    /// The conversation session has already ended
    #[error("Session closed")]
    SessionClosed,

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

impl From<crate::core::session::SessionError> for WebSocketError {
    fn from(e: crate::core::session::SessionError) -> Self {
        match e {
            crate::core::session::SessionError::Closed => WebSocketError::SessionClosed,
            other => WebSocketError::SessionStart(other.to_string()),
        }
    }
}

/// Result type for WebSocket operations
pub type WebSocketResult<T> = Result<T, WebSocketError>;
