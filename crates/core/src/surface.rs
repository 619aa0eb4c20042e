//! Raster drawing targets.
//!
//! [`Surface`] is the seam between the render engine and whatever actually
//! puts pixels somewhere. [`RasterSurface`] is the in-memory implementation
//! used by the CLI and benches.

use std::str::FromStr;

use crate::board::GridSize;
use crate::error::ConfigError;

/// Fill style for a batch of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Alive,
    /// Background colour; used to erase cells that died.
    Dead,
}

pub trait Surface {
    /// Logical grid the current pixel area can show.
    fn grid_size(&self) -> GridSize;

    /// Paint the whole area with the background.
    fn clear(&mut self);

    /// Select the style for subsequent [`Surface::fill_cell`] calls.
    fn set_fill(&mut self, fill: Fill);

    /// Fill one cell with the current style. Cells outside the area are clipped.
    fn fill_cell(&mut self, x: u32, y: u32);

    /// Flush a batch of fills.
    fn commit(&mut self) {}

    /// Change the physical size in pixels. Contents are discarded.
    fn resize(&mut self, width_px: u32, height_px: u32);
}

/// 24-bit colour, `0x00RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0x000000);
}

impl FromStr for Rgb {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| ConfigError::Color(s.to_string()))?;
        if hex.len() != 6 {
            return Err(ConfigError::Color(s.to_string()));
        }
        u32::from_str_radix(hex, 16)
            .map(Rgb)
            .map_err(|_| ConfigError::Color(s.to_string()))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub alive: Rgb,
    pub background: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            alive: Rgb(0x9CC6DB),
            background: Rgb::BLACK,
        }
    }
}

/// Pixel buffer, one `u32` per pixel, with square cells of `scale` pixels.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    width_px: u32,
    height_px: u32,
    scale: u32,
    palette: Palette,
    current: Rgb,
    pixels: Vec<u32>,
}

impl RasterSurface {
    pub fn new(width_px: u32, height_px: u32, scale: u32, palette: Palette) -> Self {
        Self {
            width_px,
            height_px,
            scale: scale.max(1),
            palette,
            current: palette.alive,
            pixels: vec![palette.background.0; width_px as usize * height_px as usize],
        }
    }

    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, px: u32, py: u32) -> Option<Rgb> {
        if px >= self.width_px || py >= self.height_px {
            return None;
        }
        let i = py as usize * self.width_px as usize + px as usize;
        Some(Rgb(self.pixels[i]))
    }

    /// Colour of a cell, sampled at its top-left pixel.
    pub fn cell_color(&self, x: u32, y: u32) -> Option<Rgb> {
        self.pixel(x.checked_mul(self.scale)?, y.checked_mul(self.scale)?)
    }

    pub fn is_alive(&self, x: u32, y: u32) -> bool {
        self.cell_color(x, y) == Some(self.palette.alive)
    }

    /// One character per cell: `#` alive, `.` anything else.
    pub fn to_ascii(&self) -> String {
        let grid = self.grid_size();
        let mut out = String::with_capacity((grid.w as usize + 1) * grid.h as usize);
        for y in 0..grid.h {
            for x in 0..grid.w {
                out.push(if self.is_alive(x, y) { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

impl Surface for RasterSurface {
    fn grid_size(&self) -> GridSize {
        GridSize::from_pixels(self.width_px, self.height_px, self.scale)
    }

    fn clear(&mut self) {
        self.pixels.fill(self.palette.background.0);
    }

    fn set_fill(&mut self, fill: Fill) {
        self.current = match fill {
            Fill::Alive => self.palette.alive,
            Fill::Dead => self.palette.background,
        };
    }

    fn fill_cell(&mut self, x: u32, y: u32) {
        let x0 = x.saturating_mul(self.scale);
        let y0 = y.saturating_mul(self.scale);
        if x0 >= self.width_px || y0 >= self.height_px {
            return;
        }
        let x1 = x0.saturating_add(self.scale).min(self.width_px) as usize;
        let y1 = y0.saturating_add(self.scale).min(self.height_px) as usize;
        let stride = self.width_px as usize;
        for py in y0 as usize..y1 {
            self.pixels[py * stride + x0 as usize..py * stride + x1].fill(self.current.0);
        }
    }

    fn resize(&mut self, width_px: u32, height_px: u32) {
        self.width_px = width_px;
        self.height_px = height_px;
        self.pixels = vec![self.palette.background.0; width_px as usize * height_px as usize];
    }
}
