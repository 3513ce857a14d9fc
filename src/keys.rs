//! Key edge detection
//!
//! CEC remotes send repeated `<User Control Pressed>` frames while a key is
//! held and one `<User Control Released>` frame at the end. This module turns
//! that stream into discrete down / press / up edges with a trailing window:
//! every frame of an episode pushes the window out, and the key-up fires
//! when the window finally closes.

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use crate::events::{CecEvent, Key};

/// Default trailing window after the last frame of an episode
pub const DEFAULT_RELEASE_WINDOW: Duration = Duration::from_millis(600);

/// Debounce state for one session
#[derive(Debug)]
pub struct KeyEdgeDetector {
    window: Duration,
    /// Armed window end, if an episode is in progress
    deadline: Option<Instant>,
    last_key: Option<Key>,
}

impl KeyEdgeDetector {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            last_key: None,
        }
    }

    /// Handle a pressed frame
    ///
    /// Always yields `KeyPress`; yields `KeyDown` first when no episode is
    /// armed.
    pub fn pressed(&mut self, key: Key, now: Instant) -> Vec<CecEvent> {
        let mut events = Vec::with_capacity(2);
        events.push(CecEvent::KeyPress(key));
        if self.deadline.is_none() {
            events.push(CecEvent::KeyDown(key));
        }
        self.last_key = Some(key);
        self.deadline = Some(now + self.window);
        trace!("Key {} pressed, window until {:?}", key, self.deadline);
        events
    }

    /// Handle a released frame: cancel the running window and start a new one
    pub fn released(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
        trace!("Key released, window until {:?}", self.deadline);
    }

    /// End of the armed window, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Close the window if it has passed, yielding the key-up
    pub fn expire(&mut self, now: Instant) -> Option<CecEvent> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.last_key.take().map(CecEvent::KeyUp)
            }
            _ => None,
        }
    }
}

impl Default for KeyEdgeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_RELEASE_WINDOW)
    }
}
