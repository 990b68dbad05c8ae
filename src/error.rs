use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by the simulation engine and its configuration layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The board leaves no valid spawn range for the configured segment extent.
    #[error("board {width}x{height} is too small for segment extent {extent}")]
    BoardTooSmall { width: u32, height: u32, extent: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `restart` was requested before any board size was known.
    #[error("engine has not been started with a board size")]
    NotStarted,

    #[error("failed to read config file {path}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to spawn ticker thread")]
    Ticker(#[source] io::Error),
}
