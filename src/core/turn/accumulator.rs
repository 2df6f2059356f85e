//! Two-buffer transcript accumulation.
//!
//! Final results are appended to the committed text; non-final results replace
//! the tentative tail wholesale, since each one restates everything heard since
//! the last final result.

use crate::core::stt::RecognitionResult;

/// Committed and tentative transcript text for the utterance in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtteranceBuffer {
    finalized: String,
    unfinalized: String,
}

impl UtteranceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one recognition result into the buffer.
    pub fn apply(&mut self, result: &RecognitionResult) {
        self.apply_text(&result.transcript, result.is_final);
    }

    /// Fold a transcript fragment into the buffer.
    ///
    /// A final fragment always clears the tentative text, even when its own text
    /// is empty. Non-empty final text is space-joined onto the committed text.
    pub fn apply_text(&mut self, text: &str, is_final: bool) {
        if is_final {
            self.unfinalized.clear();
            self.append_finalized(text);
        } else {
            self.unfinalized.clear();
            self.unfinalized.push_str(text);
        }
    }

    /// Move any tentative text into the committed text. Returns whether there was
    /// tentative text to move.
    pub fn force_finalize(&mut self) -> bool {
        if self.unfinalized.is_empty() {
            return false;
        }
        let pending = std::mem::take(&mut self.unfinalized);
        self.append_finalized(&pending);
        true
    }

    pub fn finalized(&self) -> &str {
        &self.finalized
    }

    pub fn unfinalized(&self) -> &str {
        &self.unfinalized
    }

    /// Committed and tentative text joined for display.
    pub fn combined(&self) -> String {
        format!("{} {}", self.finalized, self.unfinalized)
            .trim()
            .to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.finalized.is_empty() && self.unfinalized.is_empty()
    }

    pub fn reset(&mut self) {
        self.finalized.clear();
        self.unfinalized.clear();
    }

    fn append_finalized(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let joined = format!("{} {}", self.finalized, text);
        self.finalized = joined.trim().to_string();
    }
}
