//! Turn-taking for a streaming voice conversation.
//!
//! Recognition results are folded into an [`UtteranceBuffer`], timed by an
//! [`EndpointState`] and interpreted by a [`TurnMachine`] that decides when the
//! user has finished speaking. The machine itself is synchronous and free of I/O;
//! sessions drive it and carry out the [`TurnAction`]s it returns.

pub mod accumulator;
pub mod config;
pub mod endpoint;
pub mod errors;
pub mod machine;


pub use accumulator::UtteranceBuffer;
pub use config::{DEFAULT_SILENCE_TIMEOUT_MS, DEFAULT_WORD_DURATION_CLAMP_MS, TurnConfig};
pub use endpoint::{EndpointState, WordEndSource};
pub use errors::{TurnError, TurnResult};
pub use machine::{
    CompletionTrigger, ReplyDisposition, StaleResultFilter, TurnAction, TurnId, TurnMachine,
    TurnPhase,
};
