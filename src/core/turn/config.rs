//! Configuration types for turn-taking

use std::time::Duration;

/// Default gap after the last finalized word before an utterance is treated as complete.
pub const DEFAULT_SILENCE_TIMEOUT_MS: u64 = 1250;

/// Default upper bound the recognizer applies to a single word's reported duration.
pub const DEFAULT_WORD_DURATION_CLAMP_MS: u64 = 500;

/// Timing parameters for end-of-utterance detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnConfig {
    /// Silence after the last finalized word that completes an utterance.
    /// The comparison is strict: a gap equal to this value is not silence.
    pub silence_timeout: Duration,
    /// Maximum word duration the recognizer reports. Long alphanumeric tokens
    /// (spelled codes, serial numbers) are cut to this length, so their reported
    /// end cannot be trusted for silence measurement. Used for diagnostics only;
    /// the correction applies to every digit-bearing token regardless of this value.
    pub word_duration_clamp: Duration,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            silence_timeout: Duration::from_millis(DEFAULT_SILENCE_TIMEOUT_MS),
            word_duration_clamp: Duration::from_millis(DEFAULT_WORD_DURATION_CLAMP_MS),
        }
    }
}

impl TurnConfig {
    pub fn from_millis(silence_timeout_ms: u64, word_duration_clamp_ms: u64) -> Self {
        Self {
            silence_timeout: Duration::from_millis(silence_timeout_ms),
            word_duration_clamp: Duration::from_millis(word_duration_clamp_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TurnConfig::default();
        assert_eq!(config.silence_timeout.as_secs_f64(), 1.25);
        assert_eq!(config.word_duration_clamp.as_secs_f64(), 0.5);
        assert_eq!(config, TurnConfig::from_millis(1250, 500));
    }
}
