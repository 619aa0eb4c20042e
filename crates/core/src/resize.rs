//! Trailing-edge debounce for viewport resizes.
//!
//! Every raw resize restarts the quiet period; only the last size is released,
//! once the viewport has been still for the whole period. This keeps a window
//! drag from flooding the server with `init` commands.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct ResizeDebounce {
    quiet: Duration,
    pending: Option<(u32, u32)>,
    deadline: Option<Instant>,
}

impl ResizeDebounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            deadline: None,
        }
    }

    /// Record a resize to `width_px` x `height_px` observed at `now`.
    pub fn push(&mut self, width_px: u32, height_px: u32, now: Instant) {
        self.pending = Some((width_px, height_px));
        self.deadline = Some(now + self.quiet);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The settled size, if the quiet period has elapsed by `now`.
    pub fn take_ready(&mut self, now: Instant) -> Option<(u32, u32)> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }
}
