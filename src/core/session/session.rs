//! The per-session actor.
//!
//! All turn-taking state lives in one task that drains a serial event queue:
//! audio from the client, recognizer callbacks, clock ticks and agent replies are
//! applied strictly in arrival order. Agent calls run in their own tasks and
//! report back through the same queue, so a slow agent never blocks the session
//! or any other session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::errors::{SessionError, SessionResult};
use super::events::{ServerEvent, SessionEvent};
use super::handle::SessionHandle;
use crate::core::agent::{AgentError, AgentReply, ResponseEngine};
use crate::core::stt::{BaseSTT, RecognitionEvent, STTError, STTProviderFactory};
use crate::core::turn::{ReplyDisposition, TurnAction, TurnId, TurnMachine};

enum Flow {
    Continue,
    Stop,
}

/// One client conversation: a recognizer stream, a turn machine and a response engine.
pub struct ConversationSession {
    id: String,
    config: SessionConfig,
    machine: TurnMachine,
    stt: Box<dyn BaseSTT>,
    engine: Arc<dyn ResponseEngine>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    output: mpsc::Sender<ServerEvent>,
    /// Bumped on every reconnect; recognizer events tagged with an older value are dropped.
    generation: Arc<AtomicU64>,
    reconnect_attempts: u32,
}

impl ConversationSession {
    /// Connect a recognizer for a new session and start processing.
    ///
    /// Events for the client are delivered on `output`. The channel closes when
    /// the session ends; an [`ServerEvent::Error`] precedes an abnormal end.
    pub async fn start(
        id: impl Into<String>,
        config: SessionConfig,
        stt_factory: &STTProviderFactory,
        engine: Arc<dyn ResponseEngine>,
        output: mpsc::Sender<ServerEvent>,
    ) -> SessionResult<SessionHandle> {
        let id = id.into();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));

        let mut stt = stt_factory(config.stt.clone())?;
        register_callbacks(stt.as_mut(), &events_tx, &generation).await?;
        stt.connect().await?;
        info!(
            session_id = %id,
            provider = stt.get_provider_info(),
            agent = engine.provider_name(),
            "Conversation session started"
        );

        let session = Self {
            id: id.clone(),
            machine: TurnMachine::new(config.turn),
            config,
            stt,
            engine,
            events_tx: events_tx.clone(),
            events_rx,
            output,
            generation,
            reconnect_attempts: 0,
        };

        let task = tokio::spawn(session.run());
        Ok(SessionHandle::new(id, events_tx, task))
    }

    async fn run(mut self) {
        let interval = self.config.keepalive_interval;
        let mut keep_alive = tokio::time::interval_at(Instant::now() + interval, interval);
        keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = self.events_rx.recv() => {
                    let Some(event) = event else { break };
                    match self.handle_event(event).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Stop) => break,
                        Err(e) => {
                            error!(session_id = %self.id, "Session failed: {}", e);
                            self.emit(ServerEvent::Error { message: e.to_string() }).await;
                            break;
                        }
                    }
                }
                _ = keep_alive.tick() => self.send_keep_alive().await,
            }
        }

        self.teardown().await;
    }

    async fn handle_event(&mut self, event: SessionEvent) -> SessionResult<Flow> {
        match event {
            SessionEvent::Audio(audio) => {
                if self.config.ignored_audio_chunk_bytes == Some(audio.len()) {
                    debug!(session_id = %self.id, "Skipping {} byte audio chunk", audio.len());
                    return Ok(Flow::Continue);
                }
                if !self.stt.is_ready() {
                    debug!(session_id = %self.id, "Recognizer not ready, dropping {} bytes of audio", audio.len());
                    return Ok(Flow::Continue);
                }
                if let Err(e) = self.stt.send_audio(audio.to_vec()).await {
                    return self.recover_upstream(e).await;
                }
            }
            SessionEvent::Recognition { generation, event } => {
                if generation != self.generation.load(Ordering::SeqCst) {
                    debug!(session_id = %self.id, "Dropping event from a previous recognizer connection");
                    return Ok(Flow::Continue);
                }
                let actions = match event {
                    RecognitionEvent::Result(result) => {
                        debug!(
                            session_id = %self.id,
                            is_final = result.is_final,
                            speech_final = result.speech_final,
                            "Recognition result: '{}'",
                            result.transcript
                        );
                        self.machine.handle_result(&result)?
                    }
                    RecognitionEvent::UtteranceEnd { last_word_end } => {
                        debug!(session_id = %self.id, ?last_word_end, "Utterance end");
                        self.machine.handle_utterance_end()?
                    }
                };
                self.apply_actions(actions).await;
            }
            SessionEvent::ClockTick(stream_time) => {
                let actions = self.machine.advance_clock(stream_time)?;
                self.apply_actions(actions).await;
            }
            SessionEvent::UpstreamError { generation, error } => {
                if generation != self.generation.load(Ordering::SeqCst) {
                    debug!(session_id = %self.id, "Ignoring error from a previous recognizer connection: {}", error);
                    return Ok(Flow::Continue);
                }
                return self.recover_upstream(error).await;
            }
            SessionEvent::Reply { turn_id, result } => self.handle_reply(turn_id, result).await?,
            SessionEvent::Disconnect => {
                info!(session_id = %self.id, "Client disconnected");
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    async fn apply_actions(&mut self, actions: Vec<TurnAction>) {
        for action in actions {
            match action {
                TurnAction::DisplayPartial { text, is_final } => {
                    self.emit(ServerEvent::TranscriptPartial { text, is_final })
                        .await;
                }
                TurnAction::UtteranceComplete => self.emit(ServerEvent::UtteranceComplete).await,
                TurnAction::Dispatch {
                    turn_id,
                    text,
                    trigger,
                } => {
                    info!(session_id = %self.id, turn_id, %trigger, "Dispatching utterance: '{}'", text);
                    self.spawn_dispatch(turn_id, text);
                }
            }
        }
    }

    /// Call the response engine off the session task; the outcome comes back as
    /// a [`SessionEvent::Reply`]. The call is never cancelled.
    fn spawn_dispatch(&self, turn_id: TurnId, text: String) {
        let engine = self.engine.clone();
        let events = self.events_tx.clone();
        let session_id = self.id.clone();
        let timeout = self.config.reply_timeout;

        tokio::spawn(async move {
            let result =
                match tokio::time::timeout(timeout, engine.submit_utterance(&session_id, &text))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(AgentError::Timeout(timeout)),
                };
            if events.send(SessionEvent::Reply { turn_id, result }).is_err() {
                debug!(session_id = %session_id, turn_id, "Session ended before the reply arrived");
            }
        });
    }

    async fn handle_reply(
        &mut self,
        turn_id: TurnId,
        result: Result<AgentReply, AgentError>,
    ) -> SessionResult<()> {
        match result {
            Ok(reply) => match self.machine.complete_reply(turn_id)? {
                ReplyDisposition::Accepted => {
                    info!(
                        session_id = %self.id,
                        turn_id,
                        has_audio = reply.audio.is_some(),
                        "Bot reply: '{}'",
                        reply.text
                    );
                    self.emit(ServerEvent::from(reply)).await;
                }
                ReplyDisposition::Stale => {
                    warn!(session_id = %self.id, turn_id, "Dropping reply for abandoned turn");
                }
            },
            Err(e) => match self.machine.fail_turn(turn_id)? {
                ReplyDisposition::Accepted => {
                    warn!(session_id = %self.id, turn_id, "Turn failed: {}", e);
                    self.emit(ServerEvent::TurnFailed {
                        reason: e.to_string(),
                    })
                    .await;
                }
                ReplyDisposition::Stale => {
                    debug!(session_id = %self.id, turn_id, "Ignoring failure of abandoned turn: {}", e);
                }
            },
        }
        Ok(())
    }

    /// Reset the turn and reconnect the recognizer, giving up once the budget of
    /// consecutive failed attempts is spent.
    ///
    /// The queue keeps draining while reconnecting: audio is dropped, agent
    /// replies are settled afterwards and a disconnect stops the retries.
    async fn recover_upstream(&mut self, error: STTError) -> SessionResult<Flow> {
        warn!(session_id = %self.id, "Speech recognizer connection lost: {}", error);

        let abandoned = self.machine.in_flight_turn();
        self.machine.reset();
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(turn_id) = abandoned {
            self.emit(ServerEvent::TurnFailed {
                reason: format!("Speech recognition restarted, turn {turn_id} abandoned"),
            })
            .await;
        }

        if let Err(e) = self.stt.disconnect().await {
            debug!(session_id = %self.id, "Disconnect after failure: {}", e);
        }

        let mut replies = Vec::new();
        let mut last_error = error;
        let outcome = loop {
            if self.reconnect_attempts >= self.config.max_upstream_reconnects {
                break Err(SessionError::UpstreamUnavailable {
                    attempts: self.reconnect_attempts,
                    last_error,
                });
            }
            self.reconnect_attempts += 1;
            let backoff = self.config.reconnect_backoff * self.reconnect_attempts;

            let stt = &mut self.stt;
            let connect = async {
                tokio::time::sleep(backoff).await;
                stt.connect().await
            };
            tokio::pin!(connect);

            let attempt = loop {
                tokio::select! {
                    biased;
                    result = &mut connect => break Some(result),
                    event = self.events_rx.recv() => match event {
                        None | Some(SessionEvent::Disconnect) => break None,
                        Some(SessionEvent::Reply { turn_id, result }) => replies.push((turn_id, result)),
                        Some(SessionEvent::Audio(audio)) => {
                            debug!(session_id = %self.id, "Reconnecting, dropping {} bytes of audio", audio.len());
                        }
                        Some(_) => {}
                    },
                }
            };

            match attempt {
                None => {
                    info!(session_id = %self.id, "Client disconnected while reconnecting");
                    break Ok(Flow::Stop);
                }
                Some(Ok(())) => {
                    info!(
                        session_id = %self.id,
                        attempt = self.reconnect_attempts,
                        "Speech recognizer reconnected"
                    );
                    self.reconnect_attempts = 0;
                    break Ok(Flow::Continue);
                }
                Some(Err(e)) => {
                    warn!(
                        session_id = %self.id,
                        attempt = self.reconnect_attempts,
                        "Reconnect failed: {}", e
                    );
                    last_error = e;
                }
            }
        };

        for (turn_id, result) in replies {
            self.handle_reply(turn_id, result).await?;
        }
        outcome
    }

    async fn send_keep_alive(&mut self) {
        if !self.stt.is_ready() {
            return;
        }
        match self.stt.send_keep_alive().await {
            Ok(()) => debug!(session_id = %self.id, "Sent recognizer keep-alive"),
            Err(e) => warn!(session_id = %self.id, "Failed to send keep-alive: {}", e),
        }
    }

    async fn emit(&self, event: ServerEvent) {
        if self.output.send(event).await.is_err() {
            debug!(session_id = %self.id, "Client output closed, event dropped");
        }
    }

    async fn teardown(&mut self) {
        if let Err(e) = self.stt.disconnect().await {
            warn!(session_id = %self.id, "Failed to disconnect recognizer: {}", e);
        }
        self.machine.reset();
        info!(session_id = %self.id, "Conversation session closed");
    }
}

async fn register_callbacks(
    stt: &mut dyn BaseSTT,
    events_tx: &mpsc::UnboundedSender<SessionEvent>,
    generation: &Arc<AtomicU64>,
) -> SessionResult<()> {
    let events = events_tx.clone();
    let current = generation.clone();
    stt.on_event(Arc::new(move |event| {
        let events = events.clone();
        let generation = current.load(Ordering::SeqCst);
        Box::pin(async move {
            let _ = events.send(SessionEvent::Recognition { generation, event });
        })
    }))
    .await?;

    let events = events_tx.clone();
    let current = generation.clone();
    stt.on_error(Arc::new(move |error| {
        let events = events.clone();
        let generation = current.load(Ordering::SeqCst);
        Box::pin(async move {
            let _ = events.send(SessionEvent::UpstreamError { generation, error });
        })
    }))
    .await?;

    Ok(())
}
