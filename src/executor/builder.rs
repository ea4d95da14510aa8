//! Builder for [`ExifTool`].

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{
    ConfigFile, Encoding, LaunchConfig, Settings, DEFAULT_BLOCK_SIZE, DEFAULT_COMMON_ARGS,
    DEFAULT_EXECUTABLE, DEFAULT_TERMINATE_TIMEOUT,
};
use crate::error::ExifToolError;
use crate::logger::{Logger, SharedLogger};
use crate::process::ProcessSupervisor;

use super::ExifTool;

/// Builder for configuring an [`ExifTool`] before launch.
#[derive(Debug, Clone)]
pub struct ExifToolBuilder {
    executable: OsString,
    common_args: Vec<String>,
    config_file: Option<PathBuf>,
    encoding: Encoding,
    block_size: usize,
    check_execute: bool,
    check_tag_names: bool,
    auto_start: bool,
    resync: bool,
    terminate_timeout: Duration,
    logger: SharedLogger,
}

impl Default for ExifToolBuilder {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.into(),
            common_args: DEFAULT_COMMON_ARGS.iter().map(|s| (*s).to_string()).collect(),
            config_file: None,
            encoding: Encoding::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            check_execute: true,
            check_tag_names: true,
            auto_start: false,
            resync: false,
            terminate_timeout: DEFAULT_TERMINATE_TIMEOUT,
            logger: SharedLogger::default(),
        }
    }
}

impl ExifToolBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from values loaded by [`crate::config::SettingsLoader`].
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            executable: settings.executable.clone().into(),
            common_args: settings.common_args.clone(),
            config_file: settings.config_file.clone(),
            encoding: settings.encoding,
            block_size: settings.block_size,
            check_execute: settings.check_execute,
            check_tag_names: settings.check_tag_names,
            auto_start: settings.auto_start,
            resync: settings.resync,
            terminate_timeout: settings.terminate_timeout(),
            logger: SharedLogger::default(),
        }
    }

    /// Executable name (looked up on `PATH`) or path.
    #[must_use]
    pub fn executable(mut self, executable: impl Into<OsString>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Arguments applied to every batch. An empty list omits `-common_args`.
    #[must_use]
    pub fn common_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.common_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// `-config` file. An empty path disables exiftool's default config.
    #[must_use]
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Fail higher-level calls on a nonzero exit status.
    #[must_use]
    pub fn check_execute(mut self, enabled: bool) -> Self {
        self.check_execute = enabled;
        self
    }

    #[must_use]
    pub fn check_tag_names(mut self, enabled: bool) -> Self {
        self.check_tag_names = enabled;
        self
    }

    /// Start the process on the first higher-level call.
    #[must_use]
    pub fn auto_start(mut self, enabled: bool) -> Self {
        self.auto_start = enabled;
        self
    }

    /// Restart and retry once when per-file JSON results come back misaligned.
    #[must_use]
    pub fn resync(mut self, enabled: bool) -> Self {
        self.resync = enabled;
        self
    }

    #[must_use]
    pub fn terminate_timeout(mut self, timeout: Duration) -> Self {
        self.terminate_timeout = timeout;
        self
    }

    #[must_use]
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = SharedLogger::new(logger);
        self
    }

    #[must_use]
    pub fn shared_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = SharedLogger::from_arc(logger);
        self
    }

    /// Resolve the executable and config file and create a stopped instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the executable or config file cannot be found, or
    /// the block size is zero.
    pub fn build(self) -> Result<ExifTool, ExifToolError> {
        let mut config = LaunchConfig::new(&self.executable)?;
        config.set_common_args(self.common_args);
        config.set_encoding(self.encoding);
        config.set_block_size(self.block_size)?;
        if let Some(path) = &self.config_file {
            config.set_config_file(Some(ConfigFile::from_path(path)?));
        }

        self.logger.info(&format!(
            "Property 'executable': set to \"{}\"",
            config.executable().display()
        ));

        Ok(ExifTool {
            supervisor: ProcessSupervisor::with_logger(config, self.logger.clone()),
            last: None,
            check_execute: self.check_execute,
            check_tag_names: self.check_tag_names,
            auto_start: self.auto_start,
            resync: self.resync,
            terminate_timeout: self.terminate_timeout,
            logger: self.logger,
        })
    }
}
