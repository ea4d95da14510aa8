//! Settings file loader.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Encoding, DEFAULT_BLOCK_SIZE, DEFAULT_COMMON_ARGS, DEFAULT_EXECUTABLE};

/// File name looked for in the current directory.
pub const LOCAL_SETTINGS_FILE: &str = ".exiftool-supervisor.toml";

/// Default grace period for the `-stay_open False` handshake.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings loaded from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Executable name or path.
    pub executable: String,
    /// Arguments applied to every batch via `-common_args`.
    pub common_args: Vec<String>,
    /// `-config` file; an empty string disables the default config.
    pub config_file: Option<PathBuf>,
    /// Pipe encoding.
    pub encoding: Encoding,
    /// Read chunk size.
    pub block_size: usize,
    /// Treat a nonzero exit status as an error.
    pub check_execute: bool,
    /// Validate tag names in helper calls.
    pub check_tag_names: bool,
    /// Start the process on first use.
    pub auto_start: bool,
    /// Restart and retry once when JSON results do not line up with the requested files.
    pub resync: bool,
    /// Seconds to wait for a clean exit before killing.
    pub terminate_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            common_args: DEFAULT_COMMON_ARGS.iter().map(|s| (*s).to_string()).collect(),
            config_file: None,
            encoding: Encoding::Utf8,
            block_size: DEFAULT_BLOCK_SIZE,
            check_execute: true,
            check_tag_names: true,
            auto_start: false,
            resync: false,
            terminate_timeout_secs: DEFAULT_TERMINATE_TIMEOUT.as_secs(),
        }
    }
}

impl Settings {
    #[must_use]
    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_secs(self.terminate_timeout_secs)
    }
}

/// Settings loader that searches multiple locations.
#[derive(Debug)]
pub struct SettingsLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
}

impl SettingsLoader {
    /// Create a loader with default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from(LOCAL_SETTINGS_FILE)];

        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("exiftool-supervisor").join("config.toml"));
        }

        Self { search_paths }
    }

    /// Create a loader for one specific file.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// Load settings from the first available file, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be parsed.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        match self.find_settings_file() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading settings file");
                Self::load_from_path(&path)
            }
            None => {
                tracing::debug!("No settings file found, using defaults");
                Ok(Settings::default())
            }
        }
    }

    fn load_from_path(path: &Path) -> Result<Settings, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find the first settings file that exists.
    #[must_use]
    pub fn find_settings_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.exists()).cloned()
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}
