//! Axum WebSocket handler
//!
//! Each connection gets its own conversation session. Incoming frames are
//! forwarded to the session; session events are serialized back as JSON.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::session::{ConversationSession, ServerEvent, SessionHandle};
use crate::state::AppState;

use super::error::{WebSocketError, WebSocketResult};
use super::messages::IncomingMessage;

/// Channel buffer between the session and the socket writer
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Time allowed for queued events to reach the client after the session ends
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket conversation handler
/// Upgrades the HTTP connection to WebSocket and runs one conversation session on it
pub async fn ws_voice_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("WebSocket conversation upgrade requested");
    ws.on_upgrade(move |socket| handle_voice_socket(socket, state))
}

async fn handle_voice_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let session_id = Uuid::new_v4().to_string();
    info!(session_id = %session_id, "WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (output_tx, mut output_rx) = mpsc::channel::<ServerEvent>(CHANNEL_BUFFER_SIZE);

    let mut session = match ConversationSession::start(
        session_id.clone(),
        app_state.session_config.clone(),
        &app_state.stt_factory,
        app_state.response_engine.clone(),
        output_tx,
    )
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            let error = WebSocketError::SessionStart(e.to_string());
            error!(session_id = %session_id, "{}", error);
            let event = ServerEvent::Error {
                message: error.to_string(),
            };
            if let Err(e) = send_event(&mut sender, &event).await {
                debug!("Failed to report start failure: {}", e);
            }
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    // Writer task: ends after a fatal event or when the session drops its output
    let mut sender_task = tokio::spawn(async move {
        while let Some(event) = output_rx.recv().await {
            if let Err(e) = send_event(&mut sender, &event).await {
                error!("Failed to send WebSocket message: {}", e);
                return;
            }
            if event.is_fatal() {
                break;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });
    let mut sender_done = false;

    loop {
        select! {
            msg_result = receiver.next() => {
                match msg_result {
                    Some(Ok(msg)) => match process_message(msg, &session) {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(WebSocketError::SessionClosed) => break,
                        Err(e) => warn!(session_id = %session_id, "Ignoring client message: {}", e),
                    },
                    Some(Err(e)) => {
                        warn!(session_id = %session_id, "WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        info!(session_id = %session_id, "WebSocket connection closed by client");
                        break;
                    }
                }
            }
            _ = &mut sender_task => {
                sender_done = true;
                info!(session_id = %session_id, "Session ended, closing WebSocket");
                break;
            }
        }
    }

    session.disconnect().await;
    if !sender_done && tokio::time::timeout(FLUSH_TIMEOUT, &mut sender_task).await.is_err() {
        sender_task.abort();
    }

    info!(session_id = %session_id, "WebSocket connection terminated");
}

/// Forward one frame to the session. Returns false when the client asked to close.
fn process_message(msg: Message, session: &SessionHandle) -> WebSocketResult<bool> {
    match msg {
        Message::Text(text) => {
            let incoming: IncomingMessage = serde_json::from_str(&text)
                .map_err(|e| WebSocketError::InvalidMessage(e.to_string()))?;
            match incoming {
                IncomingMessage::Close => {
                    info!(session_id = %session.id(), "Client requested close");
                    Ok(false)
                }
                IncomingMessage::ClockTick { stream_time } => {
                    if !stream_time.is_finite() || stream_time < 0.0 {
                        return Err(WebSocketError::InvalidMessage(format!(
                            "stream_time must be a non-negative number, got {stream_time}"
                        )));
                    }
                    session.advance_clock(stream_time)?;
                    Ok(true)
                }
            }
        }
        Message::Binary(data) => {
            debug!("Received binary message: {} bytes", data.len());
            session.send_audio(data)?;
            Ok(true)
        }
        Message::Ping(_) | Message::Pong(_) => Ok(true),
        Message::Close(_) => {
            info!(session_id = %session.id(), "WebSocket connection closed by client");
            Ok(false)
        }
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> WebSocketResult<()> {
    let json = serde_json::to_string(event)
        .map_err(|e| WebSocketError::InvalidMessage(format!("Failed to serialize event: {e}")))?;
    sender
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| WebSocketError::WebSocket(e.to_string()))
}
