//! WebSocket message types
//!
//! Server to client messages are [`ServerEvent`](crate::core::session::ServerEvent)s.

use serde::{Deserialize, Serialize};

/// Text frames a client may send. Binary frames carry audio.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingMessage {
    /// End the conversation
    Close,
    /// Audio clock position in seconds, used for silence detection between results
    ClockTick { stream_time: f64 },
}
