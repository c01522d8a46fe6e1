// ── Stream update throttle ──
//
// Stream events are folded into one pending `Delta` and released at most
// once per window. The window opens with the first event after a flush
// and is never extended, so a steady stream still produces a merge every
// `window`. Time is passed in by the caller; the merge task drives it with
// `tokio::time`, which keeps this type testable with a paused clock.

use std::time::Duration;

use tokio::time::Instant;

use crate::reducer::Delta;

#[derive(Debug)]
pub struct Throttle {
    window: Duration,
    pending: Option<Delta>,
    deadline: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            deadline: None,
        }
    }

    /// Queue an update. Traffic points and anomalies accumulate; list
    /// fields the later delta supplies overwrite earlier ones.
    pub fn offer(&mut self, delta: Delta, now: Instant) {
        match self.pending.as_mut() {
            Some(pending) => pending.absorb(delta),
            None => {
                self.pending = Some(delta);
                self.deadline = Some(now + self.window);
            }
        }
    }

    /// When the pending update becomes due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Release the pending update if its window has closed.
    pub fn flush_due(&mut self, now: Instant) -> Option<Delta> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.take(),
            _ => None,
        }
    }

    /// Release the pending update regardless of the window.
    pub fn take(&mut self) -> Option<Delta> {
        self.deadline = None;
        self.pending.take()
    }
}
