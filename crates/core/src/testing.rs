//! Test doubles for the surface, transport and UI seams.
//!
//! Compiled for unit tests and behind the `testing` feature, so integration
//! tests and downstream crates can drive a [`crate::viewer::Viewer`] without a
//! socket or a window.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::board::GridSize;
use crate::error::TransportError;
use crate::surface::{Fill, Surface};
use crate::transport::Transport;
use crate::viewer::Controls;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOp {
    Clear,
    SetFill(Fill),
    FillCell(u32, u32),
    Commit,
    Resize(u32, u32),
}

/// Surface that records every call and tracks the visible alive set.
///
/// One pixel per cell, so `resize(w, h)` yields a `w`x`h` grid.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: GridSize,
    fill: Fill,
    alive: BTreeSet<(u32, u32)>,
    ops: Vec<SurfaceOp>,
}

impl RecordingSurface {
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            fill: Fill::Alive,
            alive: BTreeSet::new(),
            ops: Vec::new(),
        }
    }

    pub fn alive_set(&self) -> BTreeSet<(u32, u32)> {
        self.alive.clone()
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }

    /// Calls that changed pixels (everything except style selection and commits).
    pub fn mutation_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| {
                matches!(
                    op,
                    SurfaceOp::Clear | SurfaceOp::FillCell(..) | SurfaceOp::Resize(..)
                )
            })
            .count()
    }
}

impl Surface for RecordingSurface {
    fn grid_size(&self) -> GridSize {
        self.size
    }

    fn clear(&mut self) {
        self.ops.push(SurfaceOp::Clear);
        self.alive.clear();
    }

    fn set_fill(&mut self, fill: Fill) {
        self.ops.push(SurfaceOp::SetFill(fill));
        self.fill = fill;
    }

    fn fill_cell(&mut self, x: u32, y: u32) {
        self.ops.push(SurfaceOp::FillCell(x, y));
        if !self.size.contains(x, y) {
            return;
        }
        match self.fill {
            Fill::Alive => self.alive.insert((x, y)),
            Fill::Dead => self.alive.remove(&(x, y)),
        };
    }

    fn commit(&mut self) {
        self.ops.push(SurfaceOp::Commit);
    }

    fn resize(&mut self, width_px: u32, height_px: u32) {
        self.ops.push(SurfaceOp::Resize(width_px, height_px));
        self.size = GridSize::from_pixels(width_px, height_px, 1);
        self.alive.clear();
    }
}

/// Records every label the viewer sets on the play/pause toggle.
#[derive(Debug, Clone, Default)]
pub struct RecordingControls {
    pub labels: Vec<String>,
}

impl RecordingControls {
    pub fn current(&self) -> Option<&str> {
        self.labels.last().map(String::as_str)
    }
}

impl Controls for RecordingControls {
    fn set_play_pause_label(&mut self, label: &str) {
        self.labels.push(label.to_string());
    }
}

type Scripted = Option<Result<String, TransportError>>;

/// In-memory transport. The paired [`MockRemote`] plays the server.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Scripted>,
    sent: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

/// Server side of a [`MockTransport`].
pub struct MockRemote {
    frames: mpsc::UnboundedSender<Scripted>,
    sent: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn pair() -> (MockTransport, MockRemote) {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        (
            MockTransport {
                incoming: frames_rx,
                sent: sent_tx,
                closed: Arc::clone(&closed),
            },
            MockRemote {
                frames: frames_tx,
                sent: sent_rx,
                closed,
            },
        )
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.sent
            .send(text)
            .map_err(|_| TransportError::NotConnected)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        match self.incoming.recv().await {
            Some(item) => item,
            // Remote dropped without scripting a close: stay open.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl MockRemote {
    /// Deliver one text frame to the client.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.frames.send(Some(Ok(frame.into())));
    }

    /// Close the connection cleanly.
    pub fn close(&self) {
        let _ = self.frames.send(None);
    }

    /// Fail the connection with a transport error.
    pub fn fail(&self, err: TransportError) {
        let _ = self.frames.send(Some(Err(err)));
    }

    /// Whether the client closed its end.
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Next message the client sent, in order.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.sent.recv().await
    }

    /// Messages already sent, without waiting.
    pub fn drain_sent(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = self.sent.try_recv() {
            out.push(msg);
        }
        out
    }
}
