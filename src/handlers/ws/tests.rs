use super::*;
use crate::core::session::SessionError;

#[test]
fn test_parse_close_message() {
    let message: IncomingMessage = serde_json::from_str(r#"{"type":"close"}"#).unwrap();
    assert_eq!(message, IncomingMessage::Close);
}

#[test]
fn test_parse_clock_tick() {
    let message: IncomingMessage =
        serde_json::from_str(r#"{"type":"clock_tick","stream_time":2.5}"#).unwrap();
    assert_eq!(message, IncomingMessage::ClockTick { stream_time: 2.5 });

    let message: IncomingMessage =
        serde_json::from_str(r#"{"type":"clock_tick","stream_time":3}"#).unwrap();
    assert_eq!(message, IncomingMessage::ClockTick { stream_time: 3.0 });
}

#[test]
fn test_reject_unknown_messages() {
    for raw in [
        r#"{"type":"config"}"#,
        r#"{"type":"clock_tick"}"#,
        r#"{"text":"hello"}"#,
        "not json",
    ] {
        assert!(
            serde_json::from_str::<IncomingMessage>(raw).is_err(),
            "{raw} should not parse"
        );
    }
}

#[test]
fn test_error_conversion() {
    assert!(matches!(
        WebSocketError::from(SessionError::Closed),
        WebSocketError::SessionClosed
    ));

    let err = WebSocketError::from(SessionError::STT(
        crate::core::stt::STTError::AuthenticationFailed("API key is required".to_string()),
    ));
    assert_eq!(
        err.to_string(),
        "Failed to start session: STT error: Authentication failed: API key is required"
    );
}
