//! Conversation sessions.
//!
//! A session owns the recognizer stream and turn state for one connected client
//! and reports [`ServerEvent`]s back to it. Sessions share nothing but the
//! response engine, and run independently of each other.

mod config;
mod errors;
mod events;
mod handle;
mod session;


pub use config::{DEFAULT_RECONNECT_BACKOFF_MS, SessionConfig};
pub use errors::{SessionError, SessionResult};
pub use events::ServerEvent;
pub use handle::SessionHandle;
pub use session::ConversationSession;
