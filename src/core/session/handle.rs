use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::errors::{SessionError, SessionResult};
use super::events::SessionEvent;

/// Owner's side of a running session.
///
/// Dropping the handle ends the session as if [`SessionHandle::disconnect`] had been called.
pub struct SessionHandle {
    id: String,
    events: mpsc::UnboundedSender<SessionEvent>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub(super) fn new(
        id: String,
        events: mpsc::UnboundedSender<SessionEvent>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            events,
            task: Some(task),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue an audio chunk for the recognizer.
    pub fn send_audio(&self, audio: impl Into<Bytes>) -> SessionResult<()> {
        self.send(SessionEvent::Audio(audio.into()))
    }

    /// Advance the stream clock to `stream_time` seconds without a recognition result.
    pub fn advance_clock(&self, stream_time: f64) -> SessionResult<()> {
        self.send(SessionEvent::ClockTick(stream_time))
    }

    /// Whether the session task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// End the session and wait for its teardown. Calling this more than once is a no-op.
    pub async fn disconnect(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        let _ = self.events.send(SessionEvent::Disconnect);
        if let Err(e) = task.await {
            debug!(session_id = %self.id, "Session task ended abnormally: {}", e);
        }
    }

    fn send(&self, event: SessionEvent) -> SessionResult<()> {
        self.events.send(event).map_err(|_| SessionError::Closed)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.events.send(SessionEvent::Disconnect);
        }
    }
}
