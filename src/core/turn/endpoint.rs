//! Silence measurement against the stream clock.
//!
//! Silence is the gap between the end of the latest finalized word and the
//! furthest point of the stream any result (or clock tick) has reported.

use super::accumulator::UtteranceBuffer;
use crate::core::stt::RecognitionResult;
use std::time::Duration;

/// How a final result moved the finalized-word end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordEndSource {
    /// Non-final result, or a final result without words.
    Unchanged,
    /// The last word's own reported end.
    LastWord,
    /// The last word is a multi-character token containing a digit. Its timing is
    /// clamped by the recognizer, so the result window's end is used instead.
    ResultWindow,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointState {
    /// `None` until a final result with words has been seen.
    latest_finalized_word_end: Option<f64>,
    latest_time_seen: f64,
}

impl EndpointState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a recognition result.
    pub fn apply(&mut self, result: &RecognitionResult) -> WordEndSource {
        self.latest_time_seen = result.end_time();

        if !result.is_final {
            return WordEndSource::Unchanged;
        }
        let Some(last_word) = result.last_word() else {
            return WordEndSource::Unchanged;
        };

        if is_clamped_token(&last_word.text) {
            self.latest_finalized_word_end = Some(result.end_time());
            WordEndSource::ResultWindow
        } else {
            self.latest_finalized_word_end = Some(last_word.end);
            WordEndSource::LastWord
        }
    }

    /// Move the stream clock forward without a result. Never moves it back.
    pub fn advance_clock(&mut self, stream_time: f64) {
        if stream_time > self.latest_time_seen {
            self.latest_time_seen = stream_time;
        }
    }

    pub fn latest_finalized_word_end(&self) -> Option<f64> {
        self.latest_finalized_word_end
    }

    pub fn latest_time_seen(&self) -> f64 {
        self.latest_time_seen
    }

    /// Seconds of stream time since the last finalized word ended.
    pub fn silence_gap(&self) -> Option<f64> {
        self.latest_finalized_word_end
            .map(|word_end| self.latest_time_seen - word_end)
    }

    /// True when committed text exists, nothing tentative is pending and the
    /// silence gap strictly exceeds `silence_timeout`.
    pub fn is_silence_detected(&self, buffer: &UtteranceBuffer, silence_timeout: Duration) -> bool {
        if !buffer.unfinalized().is_empty() || buffer.finalized().is_empty() {
            return false;
        }
        self.silence_gap()
            .is_some_and(|gap| gap > silence_timeout.as_secs_f64())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Alphanumeric codes longer than one character get truncated word timings.
fn is_clamped_token(word: &str) -> bool {
    word.chars().count() > 1 && word.chars().any(|c| c.is_ascii_digit())
}
