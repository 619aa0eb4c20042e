//! # golview
//!
//! A client-side viewer for a remotely simulated Game of Life.
//!
//! The server owns the simulation and streams either full board snapshots or
//! per-cell diffs over a websocket. This crate keeps the latest unrendered
//! payload behind a dirty flag, paints it once per display frame (full repaint
//! for snapshots, incremental for diffs), and forwards play/pause/restart/init
//! commands back to the server.
//!
//! ## Quick Start
//!
//! ```
//! use golview::prelude::*;
//!
//! let mut surface = RasterSurface::new(30, 30, 15, Palette::default());
//! let mut state = SyncState::new(surface.grid_size());
//! let mut engine = RenderEngine::new();
//! let mut frames = FrameScheduler::new(60);
//!
//! let payload = decode_frame(
//!     r#"{"type":"init","w":2,"h":2,"state":[[false,true],[false,false]],"pause":false}"#,
//! )
//! .unwrap();
//! state.apply_inbound(payload);
//! frames.tick(&mut state, &mut engine, &mut surface);
//!
//! assert_eq!(surface.to_ascii(), ".#\n..\n");
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: wire format and frame classification
//! - [`sync`]: pending payload, dirty flag, pause flag, grid mirror
//! - [`render`]: full and incremental repaint
//! - [`scheduler`]: display-paced ticks
//! - [`transport`]: websocket lifecycle and command sending
//! - [`viewer`]: the event loop tying them together
//!
//! ## Feature Flags
//!
//! - `tls` (default): `wss://` endpoints via rustls
//! - `testing`: export `golview::testing`, the recording surface and mock transport

pub mod board;
pub mod config;
pub mod error;
pub mod protocol;
pub mod render;
pub mod resize;
pub mod scheduler;
pub mod surface;
pub mod sync;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;
pub mod viewer;

/// Prelude module for convenient imports.
///
/// ```
/// use golview::prelude::*;
/// ```
pub mod prelude {
    pub use crate::board::{Board, CellChange, Grid, GridSize};
    pub use crate::config::ViewerConfig;
    pub use crate::error::{ClientError, ProtocolError, SyncError, TransportError};
    pub use crate::protocol::{decode_frame, Command, DiffMessage, Payload};
    pub use crate::render::{FrameReport, RenderEngine, RepaintMode};
    pub use crate::scheduler::{FrameScheduler, TickOutcome};
    pub use crate::surface::{Fill, Palette, RasterSurface, Rgb, Surface};
    pub use crate::sync::{ApplyOutcome, Disposition, SyncState};
    pub use crate::transport::{CommandSink, ConnectionState, Inbound, TransportClient};
    pub use crate::viewer::{Controls, Flow, UiEvent, Viewer};
}
