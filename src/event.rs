//! Line capture events and the elapsed-time cursor.

use chrono::{DateTime, Local};
use std::time::Instant;

/// Which child stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

/// Capture-time stamp carrying both clocks: wall time for absolute
/// rendering, monotonic time for elapsed arithmetic.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    pub wall: DateTime<Local>,
    pub mono: Instant,
}

impl Timestamp {
    pub fn now() -> Self {
        Self {
            wall: Local::now(),
            mono: Instant::now(),
        }
    }
}

/// A single decoded line from one of the child's output streams.
///
/// Created the instant a full line is decoded and consumed exactly once by
/// the emission queue.
#[derive(Debug, Clone)]
pub struct LineEvent {
    pub at: Timestamp,
    pub source: StreamSource,
    pub text: String,
}

impl LineEvent {
    /// Build an event stamped with the current time.
    pub fn new(source: StreamSource, text: impl Into<String>) -> Self {
        Self {
            at: Timestamp::now(),
            source,
            text: text.into(),
        }
    }
}

/// Reference point for relative timestamps.
///
/// Owned exclusively by the emission queue's consumer; nothing else reads
/// or writes it, so it needs no synchronization of its own.
#[derive(Debug, Clone, Copy)]
pub struct EmissionCursor {
    pub previous: Instant,
}

impl EmissionCursor {
    pub fn new() -> Self {
        Self {
            previous: Instant::now(),
        }
    }

    /// Move the reference point, e.g. to the true start of execution.
    pub fn reset_to(&mut self, at: Instant) {
        self.previous = at;
    }
}

impl Default for EmissionCursor {
    fn default() -> Self {
        Self::new()
    }
}
