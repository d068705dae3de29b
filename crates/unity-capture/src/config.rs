use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use windows_graphics::{MAX_CHANNEL_BYTES, MAX_SHARED_FRAME_BYTES};

use crate::failure::Ignore;

const FILE_NAME: &str = "capture-config.toml";

/// The verbosity of the plugin's log file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Device and instance lifecycle.
    Info,
    /// Every outcome change and reallocation.
    Debug,
    /// Everything.
    Trace,
}

impl From<LogLevel> for Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

/// The plugin configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The most verbose level written to the log file.
    pub log_level: LogLevel,
    /// Write a log file next to the configuration.
    pub log_to_file: bool,

    /// The data capacity of each shared frame channel in bytes.
    pub max_frame_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_to_file: true,
            max_frame_bytes: MAX_SHARED_FRAME_BYTES,
        }
    }
}

/// Failed to load or save the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read the configuration file:\n{0}")]
    Read(#[source] io::Error),

    /// The file is not a valid configuration.
    #[error("Failed to parse the configuration file:\n{0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("Failed to serialize the configuration:\n{0}")]
    Serialize(#[from] toml::ser::Error),

    /// The file could not be written.
    #[error("Failed to write the configuration file:\n{0}")]
    Write(#[source] io::Error),

    /// The frame capacity is zero or beyond what the channel header can describe.
    #[error("max_frame_bytes must be between 1 and {MAX_CHANNEL_BYTES}, got {0}")]
    FrameBytes(usize),
}

impl Config {
    /// Loads the configuration from `dir`, writing the defaults if there is no file yet.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let mut file = match fs::File::open(Self::file_path(dir)) {
            Ok(file) => file,
            Err(error) => {
                if error.kind() == io::ErrorKind::NotFound {
                    let config = Self::default();
                    config.save(dir)?;
                    return Ok(config);
                }

                return Err(ConfigError::Read(error));
            }
        };

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(ConfigError::Read)?;

        let config: Self = toml::from_str(&contents)?;
        if !(1..=MAX_CHANNEL_BYTES).contains(&config.max_frame_bytes) {
            return Err(ConfigError::FrameBytes(config.max_frame_bytes));
        }

        Ok(config)
    }

    /// Writes the configuration to `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;

        fs::write(Self::file_path(dir), toml_string.as_bytes()).map_err(ConfigError::Write)
    }

    /// The path of the configuration file in `dir`.
    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join(FILE_NAME)
    }
}

/// The plugin's configuration and log directory, created if missing.
pub fn config_dir() -> Option<PathBuf> {
    let dir = dirs::config_dir()?.join("Unity Capture");

    fs::create_dir_all(&dir).ignore();

    Some(dir)
}
