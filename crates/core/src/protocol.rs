//! Wire format between the viewer and the simulation authority.
//!
//! Client -> server, one JSON object per message:
//!
//! ```text
//! { "cmd": "play" | "pause" | "restart" | "init", "options"?: { "w": int, "h": int } }
//! ```
//!
//! Server -> client frames are either a full snapshot
//! (`{"type":"init","w","h","state":[[bool]],"pause"}`) or a diff
//! (`{"changes":[{"x","y","state"}],"pause"}`, optionally tagged `"type":"diff"`).
//! Untagged frames are classified by shape. Classification happens once, in
//! [`decode_frame`]; everything downstream matches on [`Payload`].

use serde::{Deserialize, Serialize};

use crate::board::{Board, CellChange, Grid, GridSize};
use crate::error::ProtocolError;

/// User intent forwarded to the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Restart,
    /// Request a fresh board sized to the local viewport.
    Init(GridSize),
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::Play => "play",
            Command::Pause => "pause",
            Command::Restart => "restart",
            Command::Init(_) => "init",
        }
    }

    pub fn encode(self) -> Result<String, serde_json::Error> {
        let options = match self {
            Command::Init(size) => Some(size),
            _ => None,
        };
        serde_json::to_string(&CommandFrame {
            cmd: self.name(),
            options,
        })
    }
}

#[derive(Serialize)]
struct CommandFrame {
    cmd: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GridSize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffMessage {
    pub changes: Vec<CellChange>,
    pub pause: Option<bool>,
}

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Full(Board),
    Diff(DiffMessage),
}

impl Payload {
    pub fn pause(&self) -> Option<bool> {
        match self {
            Payload::Full(board) => board.pause,
            Payload::Diff(diff) => diff.pause,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Full(_) => "init",
            Payload::Diff(_) => "diff",
        }
    }
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    w: Option<u32>,
    #[serde(default)]
    h: Option<u32>,
    #[serde(default)]
    state: Option<Vec<Vec<bool>>>,
    #[serde(default)]
    changes: Option<Vec<CellChange>>,
    #[serde(default)]
    pause: Option<bool>,
}

/// Decode one inbound text frame.
pub fn decode_frame(text: &str) -> Result<Payload, ProtocolError> {
    let raw: RawFrame = serde_json::from_str(text)?;
    match raw.kind.as_deref() {
        Some("init") => full(raw),
        Some("diff") => diff(raw),
        Some(other) => Err(ProtocolError::UnknownType(other.to_string())),
        None if raw.state.is_some() => full(raw),
        None => diff(raw),
    }
}

fn full(raw: RawFrame) -> Result<Payload, ProtocolError> {
    let w = raw.w.ok_or(ProtocolError::MissingField("w"))?;
    let h = raw.h.ok_or(ProtocolError::MissingField("h"))?;
    let rows = raw.state.ok_or(ProtocolError::MissingField("state"))?;
    let grid = Grid::from_rows(GridSize::new(w, h), rows)?;
    Ok(Payload::Full(Board {
        grid,
        pause: raw.pause,
    }))
}

fn diff(raw: RawFrame) -> Result<Payload, ProtocolError> {
    let changes = raw.changes.ok_or(ProtocolError::MissingField("changes"))?;
    Ok(Payload::Diff(DiffMessage {
        changes,
        pause: raw.pause,
    }))
}
