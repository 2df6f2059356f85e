//! Two-phase turn controller.
//!
//! A session alternates between listening for a user utterance and waiting for the
//! agent's reply to it. Recognition results are only interpreted while listening;
//! anything arriving during the reply wait is discarded.

use std::fmt;

use tracing::{debug, error, info, warn};

use super::accumulator::UtteranceBuffer;
use super::config::TurnConfig;
use super::endpoint::{EndpointState, WordEndSource};
use super::errors::{TurnError, TurnResult};
use crate::core::stt::RecognitionResult;

/// Identifier of a dispatched utterance. Replies carry it back so replies to
/// turns abandoned by a reset can be told apart from the current one.
pub type TurnId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingUtterance,
    AwaitingBotReply,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnPhase::AwaitingUtterance => write!(f, "awaiting_utterance"),
            TurnPhase::AwaitingBotReply => write!(f, "awaiting_bot_reply"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    AwaitingUtterance,
    AwaitingBotReply { turn_id: TurnId },
}

impl TurnState {
    fn phase(self) -> TurnPhase {
        match self {
            TurnState::AwaitingUtterance => TurnPhase::AwaitingUtterance,
            TurnState::AwaitingBotReply { .. } => TurnPhase::AwaitingBotReply,
        }
    }
}

/// What completed an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTrigger {
    /// Recognizer flagged end of speech on a final result.
    SpeechFinal,
    /// Stream clock passed the silence timeout after the last finalized word.
    Silence,
    /// Recognizer sent a standalone utterance-end event.
    UtteranceEnd,
}

impl CompletionTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionTrigger::SpeechFinal => "speech_final",
            CompletionTrigger::Silence => "silence",
            CompletionTrigger::UtteranceEnd => "utterance_end",
        }
    }
}

impl fmt::Display for CompletionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter for results that restate text already folded in by an utterance-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleResultFilter {
    #[default]
    Idle,
    /// Ignore every result up to and including the next final one.
    SuppressingUntilNextFinal,
}

/// Side effects requested by the controller, in the order they must happen.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnAction {
    /// Show a transcript fragment to the client.
    DisplayPartial { text: String, is_final: bool },
    /// Tell the client the utterance is complete.
    UtteranceComplete,
    /// Submit the utterance to the response engine.
    Dispatch {
        turn_id: TurnId,
        text: String,
        trigger: CompletionTrigger,
    },
}

/// Whether a reply (or failure) belongs to the turn in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDisposition {
    /// The in-flight turn was closed; the caller should deliver the outcome.
    Accepted,
    /// The turn was abandoned by a reset; the outcome should be dropped.
    Stale,
}

/// Per-session turn-taking state.
#[derive(Debug)]
pub struct TurnMachine {
    config: TurnConfig,
    state: TurnState,
    buffer: UtteranceBuffer,
    endpoint: EndpointState,
    stale_filter: StaleResultFilter,
    next_turn_id: TurnId,
    abandoned_turns: Vec<TurnId>,
}

impl TurnMachine {
    pub fn new(config: TurnConfig) -> Self {
        Self {
            config,
            state: TurnState::AwaitingUtterance,
            buffer: UtteranceBuffer::new(),
            endpoint: EndpointState::new(),
            stale_filter: StaleResultFilter::Idle,
            next_turn_id: 1,
            abandoned_turns: Vec::new(),
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.state.phase()
    }

    /// Turn currently waiting for a reply.
    pub fn in_flight_turn(&self) -> Option<TurnId> {
        match self.state {
            TurnState::AwaitingBotReply { turn_id } => Some(turn_id),
            TurnState::AwaitingUtterance => None,
        }
    }

    pub fn buffer(&self) -> &UtteranceBuffer {
        &self.buffer
    }

    pub fn endpoint(&self) -> &EndpointState {
        &self.endpoint
    }

    pub fn stale_filter(&self) -> StaleResultFilter {
        self.stale_filter
    }

    pub fn config(&self) -> &TurnConfig {
        &self.config
    }

    /// Process one recognition result.
    pub fn handle_result(&mut self, result: &RecognitionResult) -> TurnResult<Vec<TurnAction>> {
        if let TurnState::AwaitingBotReply { turn_id } = self.state {
            if result.is_final && self.stale_filter == StaleResultFilter::SuppressingUntilNextFinal
            {
                self.stale_filter = StaleResultFilter::Idle;
            }
            debug!(
                "Discarding recognition result while turn {} awaits a reply: '{}'",
                turn_id, result.transcript
            );
            return Ok(Vec::new());
        }

        if self.stale_filter == StaleResultFilter::SuppressingUntilNextFinal {
            if result.is_final {
                self.stale_filter = StaleResultFilter::Idle;
            }
            debug!(
                "Ignoring result already covered by utterance end (final: {}): '{}'",
                result.is_final, result.transcript
            );
            return Ok(Vec::new());
        }

        let mut actions = vec![TurnAction::DisplayPartial {
            text: result.transcript.clone(),
            is_final: result.is_final,
        }];

        self.buffer.apply(result);
        if self.endpoint.apply(result) == WordEndSource::ResultWindow {
            debug!(
                "Word '{}' timing is clamped to {:?}; measuring silence from result end {:.3}",
                result.last_word().map(|w| w.text.as_str()).unwrap_or_default(),
                self.config.word_duration_clamp,
                result.end_time()
            );
        }

        if self.buffer.finalized().is_empty() {
            return Ok(actions);
        }

        let trigger = if result.speech_final {
            Some(CompletionTrigger::SpeechFinal)
        } else if self
            .endpoint
            .is_silence_detected(&self.buffer, self.config.silence_timeout)
        {
            Some(CompletionTrigger::Silence)
        } else {
            None
        };

        if let Some(trigger) = trigger {
            actions.extend(self.complete_utterance(trigger)?);
        }
        Ok(actions)
    }

    /// Advance the stream clock without a recognition result and re-check silence.
    pub fn advance_clock(&mut self, stream_time: f64) -> TurnResult<Vec<TurnAction>> {
        if self.state != TurnState::AwaitingUtterance {
            return Ok(Vec::new());
        }

        self.endpoint.advance_clock(stream_time);
        if self
            .endpoint
            .is_silence_detected(&self.buffer, self.config.silence_timeout)
        {
            return self.complete_utterance(CompletionTrigger::Silence);
        }
        Ok(Vec::new())
    }

    /// Process a recognizer utterance-end event.
    ///
    /// Pending tentative text is committed, and results restating it are
    /// suppressed until the next final result.
    pub fn handle_utterance_end(&mut self) -> TurnResult<Vec<TurnAction>> {
        if let TurnState::AwaitingBotReply { turn_id } = self.state {
            debug!("Ignoring utterance end while turn {} awaits a reply", turn_id);
            return Ok(Vec::new());
        }

        if self.buffer.combined().is_empty() {
            debug!("Utterance end with no transcript, nothing to complete");
            return Ok(Vec::new());
        }

        let mut actions = Vec::new();
        let pending = self.buffer.unfinalized().to_string();
        if self.buffer.force_finalize() {
            self.stale_filter = StaleResultFilter::SuppressingUntilNextFinal;
            actions.push(TurnAction::DisplayPartial {
                text: pending,
                is_final: true,
            });
        }

        actions.extend(self.complete_utterance(CompletionTrigger::UtteranceEnd)?);
        Ok(actions)
    }

    /// Close the in-flight turn after its reply was delivered.
    pub fn complete_reply(&mut self, turn_id: TurnId) -> TurnResult<ReplyDisposition> {
        self.finish_turn(turn_id, "bot reply")
    }

    /// Close the in-flight turn after its dispatch failed.
    pub fn fail_turn(&mut self, turn_id: TurnId) -> TurnResult<ReplyDisposition> {
        self.finish_turn(turn_id, "dispatch failure")
    }

    /// Drop all transcript and timing state and start listening again. Any turn
    /// in flight is abandoned; its reply will be reported as stale.
    pub fn reset(&mut self) {
        if let TurnState::AwaitingBotReply { turn_id } = self.state {
            warn!("Abandoning turn {} awaiting a reply", turn_id);
            self.abandoned_turns.push(turn_id);
            self.transition(TurnState::AwaitingUtterance, "reset");
        }
        self.buffer.reset();
        self.endpoint.reset();
        self.stale_filter = StaleResultFilter::Idle;
    }

    fn complete_utterance(&mut self, trigger: CompletionTrigger) -> TurnResult<Vec<TurnAction>> {
        if self.state != TurnState::AwaitingUtterance {
            return Err(self.invalid_transition("utterance completion"));
        }

        if trigger != CompletionTrigger::UtteranceEnd && !self.buffer.unfinalized().is_empty() {
            let violation = TurnError::ProtocolViolation(format!(
                "{} completed an utterance while tentative text '{}' was pending",
                trigger,
                self.buffer.unfinalized()
            ));
            error!("{}", violation);
            return Err(violation);
        }

        let turn_id = self.next_turn_id;
        self.next_turn_id += 1;
        let text = self.buffer.finalized().to_string();

        info!(
            "Utterance complete via {} (turn {}): '{}'",
            trigger, turn_id, text
        );
        self.transition(TurnState::AwaitingBotReply { turn_id }, trigger.as_str());

        Ok(vec![
            TurnAction::UtteranceComplete,
            TurnAction::Dispatch {
                turn_id,
                text,
                trigger,
            },
        ])
    }

    fn finish_turn(&mut self, turn_id: TurnId, event: &'static str) -> TurnResult<ReplyDisposition> {
        if let Some(position) = self.abandoned_turns.iter().position(|id| *id == turn_id) {
            self.abandoned_turns.swap_remove(position);
            warn!("Dropping {} for abandoned turn {}", event, turn_id);
            return Ok(ReplyDisposition::Stale);
        }

        match self.state {
            TurnState::AwaitingBotReply { turn_id: current } if current == turn_id => {
                self.buffer.reset();
                self.endpoint.reset();
                self.transition(TurnState::AwaitingUtterance, event);
                Ok(ReplyDisposition::Accepted)
            }
            _ => Err(self.invalid_transition(event)),
        }
    }

    fn transition(&mut self, next: TurnState, trigger: &str) {
        info!(
            "State change: {} -> {} ({})",
            self.state.phase(),
            next.phase(),
            trigger
        );
        self.state = next;
    }

    fn invalid_transition(&self, event: &'static str) -> TurnError {
        let err = TurnError::InvalidTransition {
            state: self.phase(),
            event,
        };
        error!("{}", err);
        err
    }
}
