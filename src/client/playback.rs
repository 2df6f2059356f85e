//! Barge-in: stopping bot audio when the user starts talking.

use bytes::Bytes;
use tracing::debug;

use super::ClientError;

/// Audio output that plays one encoded reply at a time.
pub trait AudioPlayer: Send {
    type Handle: PlaybackHandle;

    /// Start playing `audio` and return a handle that can stop it.
    fn play(&mut self, audio: Bytes) -> Result<Self::Handle, ClientError>;
}

/// A playback in progress.
pub trait PlaybackHandle: Send {
    /// Stop playback. Stopping a playback that already finished is harmless.
    fn stop(&mut self);
}

/// Holds at most one active playback and stops it on new user speech.
#[derive(Debug)]
pub struct PlaybackInterruptController<H: PlaybackHandle> {
    active: Option<H>,
    interruptions: u64,
}

impl<H: PlaybackHandle> Default for PlaybackInterruptController<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: PlaybackHandle> PlaybackInterruptController<H> {
    pub fn new() -> Self {
        Self {
            active: None,
            interruptions: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    /// Number of playbacks cut short by user speech.
    pub fn interruptions(&self) -> u64 {
        self.interruptions
    }

    /// React to a transcript fragment. Returns true when playback was interrupted.
    pub fn on_transcript(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let interrupted = self.stop();
        if interrupted {
            self.interruptions += 1;
            debug!("User speech interrupted bot playback: '{}'", text);
        }
        interrupted
    }

    /// Track a newly started reply playback, stopping any previous one.
    pub fn on_reply_started(&mut self, handle: H) {
        if self.stop() {
            debug!("New reply replaced an active playback");
        }
        self.active = Some(handle);
    }

    /// Stop and drop the active playback, if any.
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(mut handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }
}
