pub mod agent;
pub mod providers;
pub mod session;
pub mod stt;
pub mod turn;

// Re-export commonly used types for convenience
pub use agent::{AgentError, AgentReply, ResponseEngine, create_response_engine};
pub use session::{ConversationSession, ServerEvent, SessionConfig, SessionError, SessionHandle};
pub use stt::{
    BaseSTT, DeepgramSTT, RecognitionEvent, RecognitionResult, STTConfig, STTError,
    STTProviderFactory, create_stt_provider, default_stt_factory,
};
pub use turn::{TurnConfig, TurnError, TurnMachine, TurnPhase};
