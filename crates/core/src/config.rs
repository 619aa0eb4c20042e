//! Viewer configuration.
//!
//! Layering: [`ViewerConfig::default`], then environment (`GOLVIEW_*`), then
//! whatever the binary parses from its command line. Bad values are logged and
//! ignored; numeric knobs are clamped to their working range.

use std::time::Duration;

use tracing::warn;

use crate::board::GridSize;
use crate::error::ConfigError;
use crate::scheduler::{MAX_FRAME_RATE, MIN_FRAME_RATE};
use crate::surface::{Palette, Rgb};

pub const DEFAULT_ADDR: &str = "127.0.0.1:8081";
pub const ENDPOINT_PATH: &str = "/ws";
pub const DEFAULT_CELL_SCALE: u32 = 15;
pub const DEFAULT_VIEWPORT_PX: (u32, u32) = (1500, 1050);
pub const DEFAULT_FRAME_RATE: u32 = 60;
pub const DEFAULT_RESIZE_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// `host:port` of the simulation server.
    pub addr: String,
    /// Use `wss://` instead of `ws://`.
    pub secure: bool,
    pub viewport_px: (u32, u32),
    /// Pixels per cell edge.
    pub cell_scale: u32,
    pub frame_rate: u32,
    pub resize_debounce: Duration,
    pub palette: Palette,
    /// Log every rendered frame at `info`.
    pub debug: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            secure: false,
            viewport_px: DEFAULT_VIEWPORT_PX,
            cell_scale: DEFAULT_CELL_SCALE,
            frame_rate: DEFAULT_FRAME_RATE,
            resize_debounce: DEFAULT_RESIZE_DEBOUNCE,
            palette: Palette::default(),
            debug: false,
        }
    }
}

impl ViewerConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg
    }

    /// Overlay `GOLVIEW_*` variables read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // GOLVIEW_ADDR=host:port
        if let Some(v) = lookup("GOLVIEW_ADDR") {
            let v = v.trim();
            if !v.is_empty() {
                self.addr = v.to_string();
            }
        }
        if let Some(v) = lookup("GOLVIEW_SECURE") {
            match parse_bool(&v) {
                Some(b) => self.secure = b,
                None => warn!(value = %v, "GOLVIEW_SECURE: expected a boolean"),
            }
        }
        if let Some(v) = lookup("GOLVIEW_VIEWPORT") {
            match parse_viewport(&v) {
                Ok(px) => self.viewport_px = px,
                Err(e) => warn!("GOLVIEW_VIEWPORT: {e}"),
            }
        }
        if let Some(v) = lookup("GOLVIEW_SCALE") {
            match v.trim().parse::<u32>() {
                Ok(n) => self.set_cell_scale(n),
                Err(_) => warn!(value = %v, "GOLVIEW_SCALE: expected an integer"),
            }
        }
        if let Some(v) = lookup("GOLVIEW_FPS") {
            match v.trim().parse::<u32>() {
                Ok(n) => self.set_frame_rate(n),
                Err(_) => warn!(value = %v, "GOLVIEW_FPS: expected an integer"),
            }
        }
        if let Some(v) = lookup("GOLVIEW_DEBOUNCE_MS") {
            match v.trim().parse::<u64>() {
                Ok(ms) => self.resize_debounce = Duration::from_millis(ms),
                Err(_) => warn!(value = %v, "GOLVIEW_DEBOUNCE_MS: expected an integer"),
            }
        }
        if let Some(v) = lookup("GOLVIEW_ALIVE_COLOR") {
            match v.parse::<Rgb>() {
                Ok(c) => self.palette.alive = c,
                Err(e) => warn!("GOLVIEW_ALIVE_COLOR: {e}"),
            }
        }
        if let Some(v) = lookup("GOLVIEW_BACKGROUND_COLOR") {
            match v.parse::<Rgb>() {
                Ok(c) => self.palette.background = c,
                Err(e) => warn!("GOLVIEW_BACKGROUND_COLOR: {e}"),
            }
        }
        if let Some(v) = lookup("GOLVIEW_DEBUG") {
            self.debug = parse_bool(&v).unwrap_or(false);
        }
    }

    pub fn set_cell_scale(&mut self, scale: u32) {
        self.cell_scale = scale.max(1);
    }

    pub fn set_frame_rate(&mut self, fps: u32) {
        self.frame_rate = fps.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE);
    }

    /// Websocket URL; the scheme follows `secure`.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}{ENDPOINT_PATH}", self.addr)
    }

    /// Grid the configured viewport can show.
    pub fn grid_size(&self) -> GridSize {
        GridSize::from_pixels(self.viewport_px.0, self.viewport_px.1, self.cell_scale)
    }
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// `WIDTHxHEIGHT` in pixels, both non-zero.
pub fn parse_viewport(s: &str) -> Result<(u32, u32), ConfigError> {
    let err = || ConfigError::Viewport(s.to_string());
    let (w, h) = s
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(err)?;
    let w: u32 = w.trim().parse().map_err(|_| err())?;
    let h: u32 = h.trim().parse().map_err(|_| err())?;
    if w == 0 || h == 0 {
        return Err(err());
    }
    Ok((w, h))
}
