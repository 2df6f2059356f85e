//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `ws` - WebSocket conversation sessions

pub mod api;
pub mod ws;

pub use ws::ws_voice_handler;
