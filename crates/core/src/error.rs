//! Error taxonomy for the viewer.

use thiserror::Error;

/// A malformed inbound frame. Fatal for the render pipeline.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unknown frame type `{0}`")]
    UnknownType(String),
    #[error("board is empty ({w}x{h})")]
    EmptyGrid { w: u32, h: u32 },
    #[error("board declares {h} rows but carries {found}")]
    RowCount { h: u32, found: usize },
    #[error("board row {row} has {found} cells, expected {w}")]
    RowWidth { row: usize, w: u32, found: usize },
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The channel is not open: never connected, or already closed.
    #[error("channel is not open")]
    NotConnected,
    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
    /// A binary frame that is not UTF-8 text.
    #[error("binary frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::WebSocket(Box::new(e))
    }
}

/// Inbound data that cannot be applied to the local mirror.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("cell ({x}, {y}) is outside the {w}x{h} grid")]
    DimensionMismatch { x: u32, y: u32, w: u32, h: u32 },
    #[error("diff received before any board snapshot")]
    NoBoard,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid colour `{0}`, expected #RRGGBB")]
    Color(String),
    #[error("invalid viewport `{0}`, expected WIDTHxHEIGHT in pixels")]
    Viewport(String),
}

/// Top-level error for a viewer session.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
