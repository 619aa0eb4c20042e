//! `golview`: terminal front end for the Game of Life viewer.
//!
//! Connects to the simulation server, renders into an in-memory raster and
//! takes its controls from stdin, one command per line.

use std::process;

use golview::board::GridSize;
use golview::config::{parse_viewport, ViewerConfig};
use golview::error::{ClientError, ConfigError, TransportError};
use golview::surface::{Fill, RasterSurface, Rgb, Surface};
use golview::transport::TransportClient;
use golview::viewer::{Controls, UiEvent, Viewer};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const UI_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Flags that only matter to this binary.
#[derive(Debug, Default, PartialEq, Eq)]
struct Options {
    dump: bool,
}

fn usage() -> ! {
    eprintln!("golview (connects to ws://127.0.0.1:8081/ws by default)");
    eprintln!("Usage: golview [options]\n");
    eprintln!("Options:");
    eprintln!("  --addr <host:port>          Simulation server address");
    eprintln!("  --secure                    Use wss:// instead of ws://");
    eprintln!("  --viewport <WxH>            Viewport size in pixels (default 1500x1050)");
    eprintln!("  --scale <px>                Pixels per cell (default 15)");
    eprintln!("  --fps <1-240>               Frame rate (default 60)");
    eprintln!("  --debounce-ms <ms>          Resize quiet period (default 150)");
    eprintln!("  --alive-color <#RRGGBB>     Alive cell colour");
    eprintln!("  --background-color <#RRGGBB>  Background colour");
    eprintln!("  --debug                     Log every rendered frame");
    eprintln!("  --dump                      Print the board to stdout after each change");
    eprintln!();
    eprintln!("Commands (stdin):");
    eprintln!("  p | toggle | play | pause   Toggle play/pause");
    eprintln!("  r | restart                 Restart the simulation");
    eprintln!("  resize <W> <H> | <WxH>      Resize the viewport (pixels)");
    eprintln!("  d | debug                   Toggle frame logging");
    eprintln!("  q | quit                    Exit");
    eprintln!();
    eprintln!("Environment: GOLVIEW_ADDR, GOLVIEW_SECURE, GOLVIEW_VIEWPORT, GOLVIEW_SCALE,");
    eprintln!("  GOLVIEW_FPS, GOLVIEW_DEBOUNCE_MS, GOLVIEW_ALIVE_COLOR,");
    eprintln!("  GOLVIEW_BACKGROUND_COLOR, GOLVIEW_DEBUG; RUST_LOG for log filtering.");
    process::exit(1);
}

/// Apply command-line flags on top of `config`.
fn parse_args(
    args: impl IntoIterator<Item = String>,
    config: &mut ViewerConfig,
) -> Result<Options, CliError> {
    let mut opts = Options::default();
    let mut args = args.into_iter();

    while let Some(flag) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| CliError::Usage(format!("{name} needs a value")))
        };
        match flag.as_str() {
            "--addr" => config.addr = value("--addr")?,
            "--secure" => config.secure = true,
            "--viewport" => config.viewport_px = parse_viewport(&value("--viewport")?)?,
            "--scale" => config.set_cell_scale(parse_number(&value("--scale")?, "--scale")?),
            "--fps" => config.set_frame_rate(parse_number(&value("--fps")?, "--fps")?),
            "--debounce-ms" => {
                let ms = parse_number(&value("--debounce-ms")?, "--debounce-ms")?;
                config.resize_debounce = std::time::Duration::from_millis(ms.into());
            }
            "--alive-color" => config.palette.alive = value("--alive-color")?.parse::<Rgb>()?,
            "--background-color" => {
                config.palette.background = value("--background-color")?.parse::<Rgb>()?
            }
            "--debug" => config.debug = true,
            "--dump" => opts.dump = true,
            "-h" | "--help" => usage(),
            other => return Err(CliError::Usage(format!("unknown option `{other}`"))),
        }
    }
    Ok(opts)
}

fn parse_number(s: &str, flag: &str) -> Result<u32, CliError> {
    s.trim()
        .parse()
        .map_err(|_| CliError::Usage(format!("{flag}: expected a number, got `{s}`")))
}

/// Map one stdin line to a UI event.
fn parse_command(line: &str) -> Option<UiEvent> {
    let mut words = line.split_whitespace();
    let cmd = words.next()?.to_ascii_lowercase();
    match cmd.as_str() {
        "p" | "toggle" | "play" | "pause" => Some(UiEvent::TogglePlayPause),
        "r" | "restart" => Some(UiEvent::Restart),
        "d" | "debug" => Some(UiEvent::ToggleDebug),
        "q" | "quit" | "exit" => Some(UiEvent::Quit),
        "resize" => {
            let rest: Vec<&str> = words.collect();
            let (width_px, height_px) = match rest.as_slice() {
                [wh] => parse_viewport(wh).ok()?,
                [w, h] => (w.parse().ok()?, h.parse().ok()?),
                _ => return None,
            };
            if width_px == 0 || height_px == 0 {
                return None;
            }
            Some(UiEvent::Resize {
                width_px,
                height_px,
            })
        }
        _ => None,
    }
}

/// Prints the play/pause label whenever it changes.
struct ConsoleControls;

impl Controls for ConsoleControls {
    fn set_play_pause_label(&mut self, label: &str) {
        eprintln!("[ {label} ]  [ RESTART ]");
    }
}

/// Raster surface that can mirror itself to stdout as ASCII.
struct TerminalSurface {
    raster: RasterSurface,
    dump: bool,
    last_dump: String,
}

impl TerminalSurface {
    fn new(raster: RasterSurface, dump: bool) -> Self {
        Self {
            raster,
            dump,
            last_dump: String::new(),
        }
    }
}

impl Surface for TerminalSurface {
    fn grid_size(&self) -> GridSize {
        self.raster.grid_size()
    }

    fn clear(&mut self) {
        self.raster.clear();
    }

    fn set_fill(&mut self, fill: Fill) {
        self.raster.set_fill(fill);
    }

    fn fill_cell(&mut self, x: u32, y: u32) {
        self.raster.fill_cell(x, y);
    }

    fn commit(&mut self) {
        self.raster.commit();
        if !self.dump {
            return;
        }
        let ascii = self.raster.to_ascii();
        if ascii != self.last_dump {
            println!("{ascii}");
            self.last_dump = ascii;
        }
    }

    fn resize(&mut self, width_px: u32, height_px: u32) {
        self.raster.resize(width_px, height_px);
    }
}

async fn read_commands(ui: mpsc::Sender<UiEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let Some(event) = parse_command(&line) else {
                    warn!(line = %line.trim(), "unknown command");
                    continue;
                };
                if ui.send(event).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("stdin closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = ViewerConfig::from_env();
    let opts = match parse_args(std::env::args().skip(1), &mut config) {
        Ok(opts) => opts,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}\n");
            usage();
        }
        Err(e) => return Err(e),
    };

    let (width_px, height_px) = config.viewport_px;
    let raster = RasterSurface::new(width_px, height_px, config.cell_scale, config.palette);
    info!(
        url = %config.endpoint_url(),
        grid = %config.grid_size(),
        fps = config.frame_rate,
        "starting viewer"
    );

    let mut client = TransportClient::new();
    let inbound = client.connect(&config.endpoint_url()).await?;

    let (ui_tx, ui_rx) = mpsc::channel(UI_CHANNEL_CAPACITY);
    tokio::spawn(read_commands(ui_tx.clone()));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ui_tx.send(UiEvent::Quit).await;
        }
    });

    let surface = TerminalSurface::new(raster, opts.dump);
    let mut viewer = Viewer::new(&config, client, surface, ConsoleControls);
    viewer.run(inbound, ui_rx).await?;
    Ok(())
}
