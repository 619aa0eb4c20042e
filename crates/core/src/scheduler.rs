//! Display-paced render loop.
//!
//! One [`FrameScheduler::tick`] per display refresh: skip while paused, skip
//! when nothing is pending, otherwise render the pending payload and clear the
//! dirty flag. However many messages arrived since the last tick, at most one
//! render happens.

use std::time::Duration;

use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::trace;

use crate::render::{FrameReport, RenderEngine};
use crate::surface::Surface;
use crate::sync::SyncState;

pub const MIN_FRAME_RATE: u32 = 1;
pub const MAX_FRAME_RATE: u32 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Paused: the surface was left untouched.
    Paused,
    /// Nothing new to draw.
    Idle,
    Rendered(FrameReport),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub paused_ticks: u64,
    pub idle_ticks: u64,
    pub rendered_ticks: u64,
}

#[derive(Debug)]
pub struct FrameScheduler {
    period: Duration,
    stats: SchedulerStats,
}

impl FrameScheduler {
    pub fn new(frame_rate: u32) -> Self {
        let fps = frame_rate.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE);
        Self {
            period: Duration::from_secs(1) / fps,
            stats: SchedulerStats::default(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Frame clock. Late ticks are skipped rather than bunched up.
    pub fn interval(&self) -> Interval {
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    }

    pub fn tick<S: Surface + ?Sized>(
        &mut self,
        state: &mut SyncState,
        engine: &mut RenderEngine,
        surface: &mut S,
    ) -> TickOutcome {
        self.stats.ticks += 1;
        if state.is_paused() {
            self.stats.paused_ticks += 1;
            return TickOutcome::Paused;
        }
        let Some(payload) = state.take_pending() else {
            self.stats.idle_ticks += 1;
            return TickOutcome::Idle;
        };
        let report = engine.render(&payload, surface);
        self.stats.rendered_ticks += 1;
        trace!(kind = payload.kind(), cells = report.cells(), "frame rendered");
        TickOutcome::Rendered(report)
    }
}
