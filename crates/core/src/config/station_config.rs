use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config store {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no session named '{0}' in config store")]
    SessionNotFound(String),
}

/// Per-session capture parameters for one station.
///
/// Exactly one of `image_dataset` / `video_path` is active per session,
/// decided by which is populated on disk (see the source selector), not by
/// an explicit type tag.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct StationConfig {
    /// Shift applied to the logical frame index when addressing files or
    /// skipping into a video stream.
    pub image_number_offset: usize,
    /// Directory holding pre-extracted still images, if any.
    pub image_dataset: PathBuf,
    /// Filename prefix of the extracted images.
    pub image_path_prefix: String,
    /// Zero-padding width of the image number: 3, 4 or 5.
    pub image_path_digits: u8,
    /// Video file to decode when the image directory is empty.
    pub video_path: PathBuf,
}

/// Loads the whole config store: a JSON object mapping session keys to
/// [`StationConfig`] records.
pub fn load_config_store(path: &Path) -> Result<HashMap<String, StationConfig>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Loads one session record from the store at `path`.
pub fn load_station_config(path: &Path, session_key: &str) -> Result<StationConfig, ConfigError> {
    let mut store = load_config_store(path)?;
    store
        .remove(session_key)
        .ok_or_else(|| ConfigError::SessionNotFound(session_key.to_string()))
}

/// Default directory for station config stores.
///
/// - Linux: `$XDG_CONFIG_HOME/frameflow/` or `~/.config/frameflow/`
/// - macOS: `~/Library/Application Support/frameflow/`
/// - Windows: `%APPDATA%/frameflow/`
///
/// Falls back to the current directory when no platform config dir exists.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("frameflow"))
        .unwrap_or_else(|| PathBuf::from("."))
}
