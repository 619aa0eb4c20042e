//! Client-side view of the simulation: the pending payload, the dirty flag,
//! the pause flag, and a mirror of the grid.
//!
//! The transport side calls [`SyncState::apply_inbound`]; the frame side calls
//! [`SyncState::take_pending`]. Both run on the same task, one turn at a time,
//! so the dirty flag is a plain `bool`.
//!
//! Pending work is folded rather than overwritten: a diff that lands before the
//! previous payload was rendered is appended to it (or applied into a pending
//! snapshot), so no transition is lost when the server sends relative diffs.
//! A new snapshot replaces whatever was pending.

use tracing::{debug, info};

use crate::board::{Board, Grid, GridSize};
use crate::error::{SyncError, TransportError};
use crate::protocol::{Command, DiffMessage, Payload};
use crate::surface::Surface;
use crate::transport::CommandSink;

/// What happened to an inbound payload's cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Stored as pending render work.
    Accepted,
    /// Dropped while waiting for the snapshot that answers a resize: any diff,
    /// or a snapshot sized for another viewport.
    AwaitingSnapshot,
    /// Refused; the mirror and pending work are untouched.
    Rejected(SyncError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub disposition: Disposition,
    /// The server-reported pause flag changed to this value.
    pub pause_changed: Option<bool>,
    /// Paused -> running: tick now instead of waiting for the next frame.
    pub wake: bool,
}

#[derive(Debug)]
pub struct SyncState {
    latest: Option<Payload>,
    dirty: bool,
    /// `None` until the server first reports it.
    pause: Option<bool>,
    viewport: GridSize,
    mirror: Option<Grid>,
    awaiting_snapshot: bool,
}

impl SyncState {
    pub fn new(viewport: GridSize) -> Self {
        Self {
            latest: None,
            dirty: false,
            pause: None,
            viewport,
            mirror: None,
            awaiting_snapshot: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_paused(&self) -> bool {
        self.pause.unwrap_or(false)
    }

    pub fn pause(&self) -> Option<bool> {
        self.pause
    }

    /// Grid size requested from the server.
    pub fn viewport(&self) -> GridSize {
        self.viewport
    }

    /// Size of the last accepted snapshot.
    pub fn established(&self) -> Option<GridSize> {
        self.mirror.as_ref().map(Grid::size)
    }

    pub fn is_awaiting_snapshot(&self) -> bool {
        self.awaiting_snapshot
    }

    /// The grid as the server last described it, diffs included.
    pub fn mirror(&self) -> Option<&Grid> {
        self.mirror.as_ref()
    }

    pub fn alive_count(&self) -> usize {
        self.mirror.as_ref().map_or(0, Grid::alive_count)
    }

    pub fn latest(&self) -> Option<&Payload> {
        self.latest.as_ref()
    }

    pub fn apply_inbound(&mut self, payload: Payload) -> ApplyOutcome {
        let (pause_changed, wake) = self.apply_pause(payload.pause());
        let disposition = match payload {
            Payload::Full(board) if self.awaiting_snapshot && board.size() != self.viewport => {
                debug!(
                    size = %board.size(),
                    want = %self.viewport,
                    "snapshot for a previous viewport dropped"
                );
                Disposition::AwaitingSnapshot
            }
            Payload::Full(board) => {
                if self.awaiting_snapshot {
                    info!(size = %board.size(), "snapshot received after resize");
                }
                self.awaiting_snapshot = false;
                self.mirror = Some(board.grid.clone());
                self.latest = Some(Payload::Full(board));
                self.dirty = true;
                Disposition::Accepted
            }
            Payload::Diff(diff) => self.apply_diff(diff),
        };
        ApplyOutcome {
            disposition,
            pause_changed,
            wake,
        }
    }

    fn apply_pause(&mut self, reported: Option<bool>) -> (Option<bool>, bool) {
        let Some(paused) = reported else {
            return (None, false);
        };
        if self.pause == Some(paused) {
            return (None, false);
        }
        let was_paused = self.is_paused();
        self.pause = Some(paused);
        (Some(paused), was_paused && !paused)
    }

    fn apply_diff(&mut self, diff: DiffMessage) -> Disposition {
        if self.awaiting_snapshot {
            debug!(changes = diff.changes.len(), "diff dropped while awaiting snapshot");
            return Disposition::AwaitingSnapshot;
        }
        let Some(mirror) = self.mirror.as_mut() else {
            return Disposition::Rejected(SyncError::NoBoard);
        };
        if let Err(e) = mirror.apply(&diff.changes) {
            return Disposition::Rejected(e);
        }
        let limit = mirror.size().cell_count();

        match (self.dirty, self.latest.as_mut()) {
            (true, Some(Payload::Full(board))) => {
                for c in &diff.changes {
                    board.grid.set(c.x, c.y, c.state);
                }
                if diff.pause.is_some() {
                    board.pause = diff.pause;
                }
            }
            (true, Some(Payload::Diff(pending))) => {
                pending.changes.extend(diff.changes);
                if diff.pause.is_some() {
                    pending.pause = diff.pause;
                }
            }
            _ => self.latest = Some(Payload::Diff(diff)),
        }
        self.compact_pending(limit);
        self.dirty = true;
        Disposition::Accepted
    }

    /// A pending diff longer than the grid is dearer to paint than the grid
    /// itself; swap it for a snapshot of the mirror.
    fn compact_pending(&mut self, limit: usize) {
        let overflow = match &self.latest {
            Some(Payload::Diff(pending)) if pending.changes.len() > limit => Some(pending.pause),
            _ => None,
        };
        if let (Some(pause), Some(grid)) = (overflow, self.mirror.as_ref()) {
            debug!(limit, "pending diff promoted to a full repaint");
            self.latest = Some(Payload::Full(Board {
                grid: grid.clone(),
                pause,
            }));
        }
    }

    /// Take the unrendered payload, clearing the dirty flag.
    pub fn take_pending(&mut self) -> Option<Payload> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        self.latest.take()
    }

    /// Forward a command. Local state is never changed optimistically; the
    /// pause flag only moves when the server echoes it.
    pub fn issue_command<T: CommandSink + ?Sized>(
        &self,
        sink: &T,
        cmd: Command,
    ) -> Result<(), TransportError> {
        debug!(cmd = cmd.name(), "issuing command");
        sink.send_command(cmd)
    }

    /// The command the play/pause toggle should send right now.
    pub fn toggle_command(&self) -> Command {
        if self.is_paused() {
            Command::Play
        } else {
            Command::Pause
        }
    }

    /// Adopt a new viewport: clear the surface, drop pending work, and ask the
    /// server for a fresh board. Until that board arrives every diff is
    /// discarded, so the next render is a full repaint.
    pub fn on_resize<T: CommandSink + ?Sized, S: Surface + ?Sized>(
        &mut self,
        size: GridSize,
        sink: &T,
        surface: &mut S,
    ) -> Result<(), TransportError> {
        info!(from = %self.viewport, to = %size, "viewport resized");
        self.viewport = size;
        self.awaiting_snapshot = true;
        self.latest = None;
        self.dirty = false;
        surface.clear();
        surface.commit();
        self.issue_command(sink, Command::Init(size))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::board::{Board, CellChange};
    use crate::testing::RecordingSurface;

    #[derive(Default)]
    struct Sink(RefCell<Vec<Command>>);

    impl CommandSink for Sink {
        fn send_command(&self, cmd: Command) -> Result<(), TransportError> {
            self.0.borrow_mut().push(cmd);
            Ok(())
        }
    }

    fn full(size: GridSize, alive: &[(u32, u32)], pause: bool) -> Payload {
        let mut grid = Grid::new(size);
        for &(x, y) in alive {
            grid.set(x, y, true);
        }
        Payload::Full(Board {
            grid,
            pause: Some(pause),
        })
    }

    fn diff(changes: &[(u32, u32, bool)], pause: bool) -> Payload {
        Payload::Diff(DiffMessage {
            changes: changes
                .iter()
                .map(|&(x, y, s)| CellChange::new(x, y, s))
                .collect(),
            pause: Some(pause),
        })
    }

    #[test]
    fn inbound_sets_dirty_and_take_clears_it() {
        let mut state = SyncState::new(GridSize::new(2, 2));
        assert!(state.take_pending().is_none());

        let out = state.apply_inbound(full(GridSize::new(2, 2), &[(1, 0)], false));
        assert_eq!(out.disposition, Disposition::Accepted);
        assert!(state.is_dirty());
        assert_eq!(state.established(), Some(GridSize::new(2, 2)));

        assert!(matches!(state.take_pending(), Some(Payload::Full(_))));
        assert!(!state.is_dirty());
        assert!(state.take_pending().is_none());
    }

    #[test]
    fn pause_side_effects_fire_only_on_change() {
        let mut state = SyncState::new(GridSize::new(2, 2));

        let out = state.apply_inbound(full(GridSize::new(2, 2), &[], false));
        assert_eq!(out.pause_changed, Some(false));
        assert!(!out.wake);

        let out = state.apply_inbound(diff(&[], false));
        assert_eq!(out.pause_changed, None);

        let out = state.apply_inbound(diff(&[], true));
        assert_eq!(out.pause_changed, Some(true));
        assert!(!out.wake);
        assert!(state.is_paused());

        let out = state.apply_inbound(diff(&[], false));
        assert_eq!(out.pause_changed, Some(false));
        assert!(out.wake);

        // Absent pause leaves the flag alone.
        let out = state.apply_inbound(Payload::Diff(DiffMessage {
            changes: vec![],
            pause: None,
        }));
        assert_eq!(out.pause_changed, None);
        assert_eq!(state.pause(), Some(false));
    }

    #[test]
    fn diffs_fold_until_rendered() {
        let size = GridSize::new(3, 1);
        let mut state = SyncState::new(size);
        state.apply_inbound(full(size, &[], false));
        state.take_pending();

        state.apply_inbound(diff(&[(0, 0, true)], false));
        state.apply_inbound(diff(&[(1, 0, true), (0, 0, false)], false));

        let Some(Payload::Diff(pending)) = state.take_pending() else {
            panic!("expected a pending diff");
        };
        assert_eq!(
            pending.changes,
            vec![
                CellChange::new(0, 0, true),
                CellChange::new(1, 0, true),
                CellChange::new(0, 0, false),
            ]
        );
        assert_eq!(
            state.mirror().unwrap().alive_cells().collect::<Vec<_>>(),
            vec![(1, 0)]
        );
    }

    #[test]
    fn diff_folds_into_pending_snapshot() {
        let size = GridSize::new(2, 1);
        let mut state = SyncState::new(size);
        state.apply_inbound(full(size, &[(0, 0)], false));
        state.apply_inbound(diff(&[(0, 0, false), (1, 0, true)], false));

        let Some(Payload::Full(board)) = state.take_pending() else {
            panic!("snapshot should stay a full repaint");
        };
        assert_eq!(board.grid.alive_cells().collect::<Vec<_>>(), vec![(1, 0)]);
    }

    #[test]
    fn out_of_bounds_diff_is_rejected_whole() {
        let size = GridSize::new(2, 2);
        let mut state = SyncState::new(size);
        state.apply_inbound(full(size, &[], false));
        state.take_pending();

        let out = state.apply_inbound(diff(&[(0, 0, true), (5, 1, true)], false));
        assert_eq!(
            out.disposition,
            Disposition::Rejected(SyncError::DimensionMismatch {
                x: 5,
                y: 1,
                w: 2,
                h: 2
            })
        );
        assert!(!state.is_dirty());
        assert_eq!(state.alive_count(), 0);
    }

    #[test]
    fn diff_before_any_board_is_rejected() {
        let mut state = SyncState::new(GridSize::new(2, 2));
        let out = state.apply_inbound(diff(&[(0, 0, true)], false));
        assert_eq!(out.disposition, Disposition::Rejected(SyncError::NoBoard));
        assert!(!state.is_dirty());
    }

    #[test]
    fn resize_clears_issues_init_and_waits_for_snapshot() {
        let old = GridSize::new(100, 100);
        let new = GridSize::new(80, 90);
        let sink = Sink::default();
        let mut surface = RecordingSurface::new(new);
        let mut state = SyncState::new(old);
        state.apply_inbound(full(old, &[(99, 99)], false));
        state.apply_inbound(diff(&[(0, 0, true)], false));

        state.on_resize(new, &sink, &mut surface).unwrap();

        assert_eq!(*sink.0.borrow(), vec![Command::Init(new)]);
        assert_eq!(state.viewport(), new);
        assert!(!state.is_dirty());
        assert!(surface.ops().contains(&crate::testing::SurfaceOp::Clear));

        // Valid under the old grid only, then even a small one: both dropped.
        let out = state.apply_inbound(diff(&[(85, 95, true)], false));
        assert_eq!(out.disposition, Disposition::AwaitingSnapshot);
        let out = state.apply_inbound(diff(&[(1, 1, true)], false));
        assert_eq!(out.disposition, Disposition::AwaitingSnapshot);
        assert!(state.take_pending().is_none());

        state.apply_inbound(full(new, &[], false));
        assert!(matches!(state.take_pending(), Some(Payload::Full(_))));
        assert_eq!(state.established(), Some(new));
    }

    #[test]
    fn snapshot_for_the_old_viewport_does_not_end_the_wait() {
        let old = GridSize::new(100, 100);
        let new = GridSize::new(80, 90);
        let sink = Sink::default();
        let mut surface = RecordingSurface::new(new);
        let mut state = SyncState::new(old);
        state.apply_inbound(full(old, &[], false));
        state.take_pending();

        state.on_resize(new, &sink, &mut surface).unwrap();

        // e.g. the answer to a restart sent just before the resize
        let out = state.apply_inbound(full(old, &[(99, 99)], false));
        assert_eq!(out.disposition, Disposition::AwaitingSnapshot);
        assert!(state.is_awaiting_snapshot());
        assert!(!state.is_dirty());
        assert_eq!(state.established(), Some(old));

        let out = state.apply_inbound(diff(&[(85, 95, true)], false));
        assert_eq!(out.disposition, Disposition::AwaitingSnapshot);

        let out = state.apply_inbound(full(new, &[(79, 89)], false));
        assert_eq!(out.disposition, Disposition::Accepted);
        assert!(!state.is_awaiting_snapshot());
        assert_eq!(state.established(), Some(new));
        assert_eq!(state.alive_count(), 1);
    }

    #[test]
    fn paused_diffs_are_bounded_by_the_grid() {
        let size = GridSize::new(2, 2);
        let mut state = SyncState::new(size);
        state.apply_inbound(full(size, &[], false));
        state.take_pending();

        for i in 0..10_000u32 {
            let x = i % 2;
            let y = (i / 2) % 2;
            state.apply_inbound(diff(&[(x, y, i % 3 == 0)], true));
            let pending = match state.latest() {
                Some(Payload::Diff(d)) => d.changes.len(),
                Some(Payload::Full(_)) => 0,
                None => panic!("pending work lost"),
            };
            assert!(pending <= size.cell_count());
        }

        let Some(Payload::Full(board)) = state.take_pending() else {
            panic!("overlong diff should become a full repaint");
        };
        assert_eq!(Some(&board.grid), state.mirror());
        assert_eq!(board.pause, Some(true));
    }

    #[test]
    fn commands_are_not_applied_optimistically() {
        let sink = Sink::default();
        let mut state = SyncState::new(GridSize::new(2, 2));
        state.apply_inbound(full(GridSize::new(2, 2), &[], false));

        assert_eq!(state.toggle_command(), Command::Pause);
        state.issue_command(&sink, state.toggle_command()).unwrap();
        assert!(!state.is_paused());
        assert_eq!(state.toggle_command(), Command::Pause);

        state.apply_inbound(diff(&[], true));
        assert_eq!(state.toggle_command(), Command::Play);
    }
}
