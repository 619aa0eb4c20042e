//! The viewer session: one task owning the sync state, the surface and the
//! controls, fed by three sources.
//!
//! - inbound events from the transport task,
//! - UI events (toggle, restart, resize, debug, quit),
//! - the frame clock.
//!
//! Each `select!` arm runs to completion before the next one starts, so every
//! mutation of [`SyncState`] happens in its own turn.

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::config::ViewerConfig;
use crate::error::{ClientError, TransportError};
use crate::protocol::Command;
use crate::render::{RenderEngine, RenderStats, RepaintMode};
use crate::resize::ResizeDebounce;
use crate::scheduler::{FrameScheduler, SchedulerStats, TickOutcome};
use crate::surface::Surface;
use crate::sync::{Disposition, SyncState};
use crate::transport::{ConnectionState, Inbound, TransportClient};

/// The user-facing controls the viewer drives.
pub trait Controls {
    fn set_play_pause_label(&mut self, label: &str);
}

/// Label for the play/pause toggle: it offers the action that would change
/// the current state.
pub fn play_pause_label(paused: bool) -> &'static str {
    if paused {
        "PLAY"
    } else {
        "PAUSE"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    TogglePlayPause,
    Restart,
    /// Raw viewport size in pixels; debounced before it takes effect.
    Resize { width_px: u32, height_px: u32 },
    ToggleDebug,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct Viewer<S: Surface, C: Controls> {
    state: SyncState,
    engine: RenderEngine,
    scheduler: FrameScheduler,
    surface: S,
    controls: C,
    client: TransportClient,
    debounce: ResizeDebounce,
    debug: bool,
}

impl<S: Surface, C: Controls> Viewer<S, C> {
    pub fn new(
        config: &ViewerConfig,
        client: TransportClient,
        surface: S,
        mut controls: C,
    ) -> Self {
        controls.set_play_pause_label(play_pause_label(false));
        Self {
            state: SyncState::new(surface.grid_size()),
            engine: RenderEngine::new(),
            scheduler: FrameScheduler::new(config.frame_rate),
            surface,
            controls,
            client,
            debounce: ResizeDebounce::new(config.resize_debounce),
            debug: config.debug,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn controls(&self) -> &C {
        &self.controls
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.client.state()
    }

    pub fn render_stats(&self) -> RenderStats {
        self.engine.stats()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Ask the server for a board sized to the surface. The connection must
    /// already be open.
    pub fn begin(&mut self) -> Result<(), TransportError> {
        let size = self.surface.grid_size();
        self.state.on_resize(size, &self.client, &mut self.surface)
    }

    pub fn handle_inbound(&mut self, event: Inbound) -> Result<Flow, ClientError> {
        match event {
            Inbound::Payload(payload) => {
                let kind = payload.kind();
                let outcome = self.state.apply_inbound(payload);
                match &outcome.disposition {
                    Disposition::Accepted => trace!(kind, "payload accepted"),
                    Disposition::AwaitingSnapshot => debug!(kind, "payload discarded"),
                    Disposition::Rejected(e) => warn!(kind, error = %e, "payload rejected"),
                }
                if let Some(paused) = outcome.pause_changed {
                    info!(paused, "simulation pause state changed");
                    self.controls.set_play_pause_label(play_pause_label(paused));
                }
                if outcome.wake {
                    self.tick();
                }
                Ok(Flow::Continue)
            }
            Inbound::Malformed(e) => {
                error!(error = %e, "malformed frame, halting");
                Err(e.into())
            }
            Inbound::Closed => {
                warn!(
                    alive = self.state.alive_count(),
                    "connection closed, board frozen"
                );
                Ok(Flow::Stop)
            }
            Inbound::Failed(e) => {
                error!(error = %e, "connection failed, board frozen");
                Err(e.into())
            }
        }
    }

    /// Apply a UI event observed at `now`. Send failures are logged; the
    /// session carries on.
    pub fn handle_ui(&mut self, event: UiEvent, now: Instant) -> Flow {
        match event {
            UiEvent::TogglePlayPause => {
                let cmd = self.state.toggle_command();
                self.send(cmd);
            }
            UiEvent::Restart => self.send(Command::Restart),
            UiEvent::Resize {
                width_px,
                height_px,
            } => self.debounce.push(width_px, height_px, now),
            UiEvent::ToggleDebug => {
                self.debug = !self.debug;
                info!(debug = self.debug, "debug frame logging toggled");
            }
            UiEvent::Quit => return Flow::Stop,
        }
        Flow::Continue
    }

    fn send(&self, cmd: Command) {
        if let Err(e) = self.state.issue_command(&self.client, cmd) {
            warn!(cmd = cmd.name(), error = %e, "command not sent");
        }
    }

    /// Adopt the settled viewport size, if the debounce period is over.
    /// Returns whether a resize took effect.
    pub fn flush_resize(&mut self, now: Instant) -> bool {
        let Some((width_px, height_px)) = self.debounce.take_ready(now) else {
            return false;
        };
        self.surface.resize(width_px, height_px);
        let size = self.surface.grid_size();
        if let Err(e) = self.state.on_resize(size, &self.client, &mut self.surface) {
            warn!(%size, error = %e, "init not sent after resize");
        }
        true
    }

    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self
            .scheduler
            .tick(&mut self.state, &mut self.engine, &mut self.surface);
        if let TickOutcome::Rendered(report) = outcome {
            match report.mode {
                RepaintMode::Full => info!(
                    alive = report.alive,
                    size = ?self.state.established(),
                    "full repaint"
                ),
                RepaintMode::Incremental if self.debug => info!(
                    born = report.alive,
                    died = report.dead,
                    alive = self.state.alive_count(),
                    frames = self.engine.stats().frames,
                    "incremental repaint"
                ),
                RepaintMode::Incremental => debug!(
                    born = report.alive,
                    died = report.dead,
                    "incremental repaint"
                ),
            }
        }
        outcome
    }

    /// Drive the session until the connection ends or the user quits.
    ///
    /// Sends the initial `init` first. A closed connection or a quit ends the
    /// session cleanly; a malformed frame or a failed connection ends it with
    /// an error. The transport is shut down either way.
    pub async fn run(
        &mut self,
        inbound: mpsc::Receiver<Inbound>,
        ui: mpsc::Receiver<UiEvent>,
    ) -> Result<(), ClientError> {
        let result = self.drive(inbound, ui).await;
        self.client.shutdown().await;
        info!(
            frames = self.engine.stats().frames,
            paused_ticks = self.scheduler.stats().paused_ticks,
            "viewer stopped"
        );
        result
    }

    async fn drive(
        &mut self,
        mut inbound: mpsc::Receiver<Inbound>,
        mut ui: mpsc::Receiver<UiEvent>,
    ) -> Result<(), ClientError> {
        self.begin()?;
        let mut frames = self.scheduler.interval();
        let mut ui_open = true;

        loop {
            let resize_at = self.debounce.deadline();
            tokio::select! {
                event = inbound.recv() => {
                    let Some(event) = event else {
                        debug!("transport task gone");
                        return Ok(());
                    };
                    if self.handle_inbound(event)? == Flow::Stop {
                        return Ok(());
                    }
                }
                event = ui.recv(), if ui_open => match event {
                    Some(event) => {
                        if self.handle_ui(event, Instant::now()) == Flow::Stop {
                            info!("quit requested");
                            return Ok(());
                        }
                    }
                    None => {
                        debug!("ui closed, display only");
                        ui_open = false;
                    }
                },
                _ = frames.tick() => {
                    self.tick();
                }
                _ = time::sleep_until(resize_at.unwrap_or_else(Instant::now)), if resize_at.is_some() => {
                    self.flush_resize(Instant::now());
                }
            }
        }
    }
}
