use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

const APP_DIR_NAME: &str = "snake-engine";
const CONFIG_FILE_NAME: &str = "config.json";

/// Default side length of one square segment, in board units.
pub const DEFAULT_SEGMENT_EXTENT: u32 = 30;

/// Default interval between two simulation ticks in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Default board dimensions used by the demo host.
pub const DEFAULT_BOARD_WIDTH: u32 = 600;
pub const DEFAULT_BOARD_HEIGHT: u32 = 450;

/// Board dimensions passed through the engine as a named type.
///
/// Set once per [`start`](crate::game::Simulation::start) and never mutated
/// while a run is in progress.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct BoardSize {
    pub width: u32,
    pub height: u32,
}

impl BoardSize {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true when both dimensions leave a non-empty spawn range for
    /// segments of the given extent.
    #[must_use]
    pub fn fits_extent(self, extent: u32) -> bool {
        let min = u64::from(extent) * 2;
        u64::from(self.width) > min && u64::from(self.height) > min
    }
}

/// Cosmetic color tag carried by every segment.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Yellow,
    Green,
    Blue,
    White,
}

/// Tunable engine parameters.
///
/// Every field has a default, so a partial JSON file is valid.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Side length of a segment; also the distance moved per tick.
    pub segment_extent: u32,
    pub tick_interval_ms: u64,
    pub head_color: Color,
    pub body_color: Color,
    pub fruit_color: Color,
    /// Accept a direction opposite to the current heading on a multi-segment snake.
    pub allow_reversal: bool,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            segment_extent: DEFAULT_SEGMENT_EXTENT,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            head_color: Color::Red,
            body_color: Color::Yellow,
            fruit_color: Color::Green,
            allow_reversal: false,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Returns the tick interval as a [`Duration`].
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Rejects parameters the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.segment_extent == 0 {
            return Err(EngineError::InvalidConfig(
                "segment_extent must be positive".into(),
            ));
        }
        if i32::try_from(self.segment_extent).is_err() {
            return Err(EngineError::InvalidConfig(format!(
                "segment_extent {} does not fit board coordinates",
                self.segment_extent
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "tick_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Returns the platform-correct default config file path.
#[must_use]
pub fn config_path() -> PathBuf {
    let mut base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push(APP_DIR_NAME);
    base.push(CONFIG_FILE_NAME);
    base
}

/// Loads engine configuration from `path`.
///
/// Returns the defaults when the file does not exist yet. Returns `Err` when
/// the file exists but cannot be read, parsed, or validated.
pub fn load_config_from_path(path: &Path) -> Result<EngineConfig, EngineError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("no config file at {}, using defaults", path.display());
            return Ok(EngineConfig::default());
        }
        Err(source) => {
            return Err(EngineError::ConfigFile {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let config: EngineConfig =
        serde_json::from_str(&raw).map_err(|source| EngineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}
