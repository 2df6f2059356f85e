//! Error types for turn-taking

use super::machine::TurnPhase;

/// Failures that leave a session's turn state untrustworthy. Both variants are
/// fatal for the session that raised them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TurnError {
    /// The recognizer stream contradicted a guarantee of its protocol, such as
    /// signalling end of speech while tentative text was still pending.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
    /// An event arrived in a phase that cannot accept it.
    #[error("Invalid transition: {event} while {state}")]
    InvalidTransition {
        state: TurnPhase,
        event: &'static str,
    },
}

/// Result type for turn-taking operations
pub type TurnResult<T> = Result<T, TurnError>;
