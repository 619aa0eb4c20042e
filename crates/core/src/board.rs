//! Grid model: dimensions, cells, and the snapshot the authority sends.

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, SyncError};

/// Grid dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub w: u32,
    pub h: u32,
}

impl GridSize {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    /// Cells that fit in a pixel area at `scale` pixels per cell.
    ///
    /// Partial cells at the right/bottom edge are dropped; never smaller than 1x1.
    pub fn from_pixels(width_px: u32, height_px: u32, scale: u32) -> Self {
        let scale = scale.max(1);
        Self {
            w: (width_px / scale).max(1),
            h: (height_px / scale).max(1),
        }
    }

    pub fn contains(self, x: u32, y: u32) -> bool {
        x < self.w && y < self.h
    }

    pub fn cell_count(self) -> usize {
        self.w as usize * self.h as usize
    }

    /// First change that falls outside this grid.
    pub fn check(self, changes: &[CellChange]) -> Result<(), SyncError> {
        match changes.iter().find(|c| !self.contains(c.x, c.y)) {
            Some(c) => Err(SyncError::DimensionMismatch {
                x: c.x,
                y: c.y,
                w: self.w,
                h: self.h,
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Display for GridSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// A single cell transition since the last rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellChange {
    pub x: u32,
    pub y: u32,
    pub state: bool,
}

impl CellChange {
    pub const fn new(x: u32, y: u32, state: bool) -> Self {
        Self { x, y, state }
    }
}

/// Row-major boolean grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: GridSize,
    cells: Vec<bool>,
}

impl Grid {
    /// All-dead grid.
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![false; size.cell_count()],
        }
    }

    /// Build from `state[y][x]` rows, checking them against the declared size.
    pub fn from_rows(size: GridSize, rows: Vec<Vec<bool>>) -> Result<Self, ProtocolError> {
        if size.w == 0 || size.h == 0 {
            return Err(ProtocolError::EmptyGrid {
                w: size.w,
                h: size.h,
            });
        }
        if rows.len() != size.h as usize {
            return Err(ProtocolError::RowCount {
                h: size.h,
                found: rows.len(),
            });
        }
        let mut cells = Vec::with_capacity(size.cell_count());
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != size.w as usize {
                return Err(ProtocolError::RowWidth {
                    row,
                    w: size.w,
                    found: values.len(),
                });
            }
            cells.extend(values);
        }
        Ok(Self { size, cells })
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        self.size
            .contains(x, y)
            .then(|| y as usize * self.size.w as usize + x as usize)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<bool> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Returns `false` when `(x, y)` is out of bounds.
    pub fn set(&mut self, x: u32, y: u32, alive: bool) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.cells[i] = alive;
                true
            }
            None => false,
        }
    }

    /// Apply a diff in order. All-or-nothing: bounds are checked first.
    pub fn apply(&mut self, changes: &[CellChange]) -> Result<(), SyncError> {
        self.size.check(changes)?;
        for c in changes {
            self.set(c.x, c.y, c.state);
        }
        Ok(())
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Alive coordinates in row-major order.
    pub fn alive_cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let w = self.size.w as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(move |(i, _)| ((i % w) as u32, (i / w) as u32))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.cells.chunks(self.size.w.max(1) as usize)
    }
}

/// Full snapshot from the simulation authority. Replaces any prior board wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub grid: Grid,
    pub pause: Option<bool>,
}

impl Board {
    pub fn size(&self) -> GridSize {
        self.grid.size()
    }
}
