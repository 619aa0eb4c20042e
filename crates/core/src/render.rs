//! Full and incremental repaint.
//!
//! The strategy is chosen by payload shape: a [`Payload::Full`] clears the
//! surface and paints every alive cell; a [`Payload::Diff`] touches only the
//! cells it names. Incremental paints go dead-first, then alive, with one
//! `set_fill` per group so a surface that batches one style per path never
//! switches style mid-batch.
//!
//! The engine does not track grid identity. Callers must force a full repaint
//! after any dimension change (see `SyncState::on_resize`).

use hashbrown::HashMap;

use crate::board::{Board, CellChange};
use crate::protocol::Payload;
use crate::surface::{Fill, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepaintMode {
    Full,
    Incremental,
}

/// What a single repaint did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub mode: RepaintMode,
    /// Cells painted alive.
    pub alive: usize,
    /// Cells painted dead (always 0 for a full repaint; `clear` covers them).
    pub dead: usize,
}

impl FrameReport {
    pub fn cells(&self) -> usize {
        self.alive + self.dead
    }
}

/// Running totals across the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames: u64,
    pub full_repaints: u64,
    pub incremental_repaints: u64,
    pub cells_painted: u64,
}

#[derive(Debug, Default)]
pub struct RenderEngine {
    stats: RenderStats,
}

impl RenderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn render<S: Surface + ?Sized>(
        &mut self,
        payload: &Payload,
        surface: &mut S,
    ) -> FrameReport {
        match payload {
            Payload::Full(board) => self.full_repaint(board, surface),
            Payload::Diff(diff) => self.incremental_repaint(&diff.changes, surface),
        }
    }

    /// Clear, then paint every alive cell. O(w·h).
    pub fn full_repaint<S: Surface + ?Sized>(
        &mut self,
        board: &Board,
        surface: &mut S,
    ) -> FrameReport {
        surface.clear();
        surface.set_fill(Fill::Alive);
        let mut alive = 0;
        for (x, y) in board.grid.alive_cells() {
            surface.fill_cell(x, y);
            alive += 1;
        }
        surface.commit();

        let report = FrameReport {
            mode: RepaintMode::Full,
            alive,
            dead: 0,
        };
        self.record(report);
        report
    }

    /// Paint only the changed cells. O(|changes|).
    ///
    /// Within one diff the last write per coordinate wins.
    pub fn incremental_repaint<S: Surface + ?Sized>(
        &mut self,
        changes: &[CellChange],
        surface: &mut S,
    ) -> FrameReport {
        let (dead, alive) = partition_latest(changes);

        if !dead.is_empty() {
            surface.set_fill(Fill::Dead);
            for c in &dead {
                surface.fill_cell(c.x, c.y);
            }
            surface.commit();
        }
        if !alive.is_empty() {
            surface.set_fill(Fill::Alive);
            for c in &alive {
                surface.fill_cell(c.x, c.y);
            }
            surface.commit();
        }

        let report = FrameReport {
            mode: RepaintMode::Incremental,
            alive: alive.len(),
            dead: dead.len(),
        };
        self.record(report);
        report
    }

    fn record(&mut self, report: FrameReport) {
        self.stats.frames += 1;
        self.stats.cells_painted += report.cells() as u64;
        match report.mode {
            RepaintMode::Full => self.stats.full_repaints += 1,
            RepaintMode::Incremental => self.stats.incremental_repaints += 1,
        }
    }
}

/// Split into (became dead, became alive), keeping only the final write per
/// coordinate. Input order is preserved within each group.
fn partition_latest(changes: &[CellChange]) -> (Vec<CellChange>, Vec<CellChange>) {
    let mut last: HashMap<(u32, u32), usize> = HashMap::with_capacity(changes.len());
    for (i, c) in changes.iter().enumerate() {
        last.insert((c.x, c.y), i);
    }

    let mut dead = Vec::new();
    let mut alive = Vec::new();
    for (i, c) in changes.iter().enumerate() {
        if last.get(&(c.x, c.y)) != Some(&i) {
            continue;
        }
        if c.state {
            alive.push(*c);
        } else {
            dead.push(*c);
        }
    }
    (dead, alive)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::board::{Grid, GridSize};
    use crate::testing::{RecordingSurface, SurfaceOp};

    fn board(size: GridSize, rows: Vec<Vec<bool>>) -> Board {
        Board {
            grid: Grid::from_rows(size, rows).unwrap(),
            pause: Some(false),
        }
    }

    #[test]
    fn full_repaint_paints_exactly_the_alive_set() {
        let b = board(
            GridSize::new(3, 2),
            vec![vec![true, false, true], vec![false, true, false]],
        );
        let mut surface = RecordingSurface::new(GridSize::new(3, 2));
        surface.set_fill(Fill::Alive);
        surface.fill_cell(1, 0); // stale cell from a previous frame

        let mut engine = RenderEngine::new();
        let report = engine.full_repaint(&b, &mut surface);

        assert_eq!(report.mode, RepaintMode::Full);
        assert_eq!(report.alive, 3);
        assert_eq!(
            surface.alive_set(),
            b.grid.alive_cells().collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn incremental_paints_dead_before_alive_with_one_style_switch_each() {
        let mut surface = RecordingSurface::new(GridSize::new(4, 4));
        surface.take_ops();

        let changes = [
            CellChange::new(0, 0, true),
            CellChange::new(1, 0, false),
            CellChange::new(2, 0, true),
            CellChange::new(3, 0, false),
        ];
        let mut engine = RenderEngine::new();
        engine.incremental_repaint(&changes, &mut surface);

        assert_eq!(
            surface.take_ops(),
            vec![
                SurfaceOp::SetFill(Fill::Dead),
                SurfaceOp::FillCell(1, 0),
                SurfaceOp::FillCell(3, 0),
                SurfaceOp::Commit,
                SurfaceOp::SetFill(Fill::Alive),
                SurfaceOp::FillCell(0, 0),
                SurfaceOp::FillCell(2, 0),
                SurfaceOp::Commit,
            ]
        );
    }

    #[test]
    fn last_write_per_coordinate_wins() {
        let mut surface = RecordingSurface::new(GridSize::new(2, 2));
        let mut engine = RenderEngine::new();
        let report = engine.incremental_repaint(
            &[
                CellChange::new(0, 0, true),
                CellChange::new(1, 1, true),
                CellChange::new(0, 0, false),
            ],
            &mut surface,
        );
        assert_eq!(report.alive, 1);
        assert_eq!(report.dead, 1);
        assert_eq!(surface.alive_set(), BTreeSet::from([(1, 1)]));
    }

    #[test]
    fn empty_diff_touches_nothing() {
        let mut surface = RecordingSurface::new(GridSize::new(2, 2));
        surface.set_fill(Fill::Alive);
        surface.fill_cell(1, 1);
        surface.take_ops();

        let mut engine = RenderEngine::new();
        let report = engine.incremental_repaint(&[], &mut surface);

        assert_eq!(report.cells(), 0);
        assert!(surface.take_ops().is_empty());
        assert_eq!(surface.alive_set(), BTreeSet::from([(1, 1)]));
    }

    #[test]
    fn stats_accumulate_by_mode() {
        let mut surface = RecordingSurface::new(GridSize::new(2, 2));
        let mut engine = RenderEngine::new();
        let b = board(GridSize::new(2, 2), vec![vec![true, true], vec![false, false]]);
        engine.render(&Payload::Full(b), &mut surface);
        engine.incremental_repaint(&[CellChange::new(0, 1, true)], &mut surface);

        let stats = engine.stats();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.full_repaints, 1);
        assert_eq!(stats.incremental_repaints, 1);
        assert_eq!(stats.cells_painted, 3);
    }
}
