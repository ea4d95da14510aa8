//! Lifecycle of the single resident exiftool process.

use std::ffi::OsStr;
use std::time::Duration;

use crate::config::{ConfigFile, Encoding, LaunchConfig};
use crate::error::{ExifToolError, ProtocolError, EXIFTOOL_MINIMUM_VERSION};
use crate::logger::SharedLogger;
use crate::protocol::{Param, Response};

use super::ProcessHandle;

/// Grace period given to a half-started child that failed the version check.
const ABORTED_START_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of [`ProcessSupervisor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Result of [`ProcessSupervisor::terminate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    Terminated,
    NotRunning,
}

/// Owns the launch configuration and, while running, the child process.
///
/// Dropping a running supervisor kills the child immediately, skipping the
/// `-stay_open False` handshake.
#[derive(Debug)]
pub struct ProcessSupervisor {
    config: LaunchConfig,
    handle: Option<ProcessHandle>,
    version: Option<String>,
    logger: SharedLogger,
}

impl ProcessSupervisor {
    #[must_use]
    pub fn new(config: LaunchConfig) -> Self {
        Self::with_logger(config, SharedLogger::default())
    }

    #[must_use]
    pub fn with_logger(config: LaunchConfig, logger: SharedLogger) -> Self {
        Self {
            config,
            handle: None,
            version: None,
            logger,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    pub fn set_logger(&mut self, logger: SharedLogger) {
        self.logger = logger;
    }

    /// Whether the child is alive, checked against the OS on every call.
    ///
    /// A child that died since the last check is forgotten and a warning is
    /// emitted once; later calls just return `false`.
    pub fn running(&mut self) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };

        if handle.has_exited() {
            let pid = handle.pid();
            tracing::debug!(pid, "exiftool exited unexpectedly");
            self.logger
                .warn("Property 'running': ExifTool process was previously running but died");
            self.flag_not_running();
        }

        self.handle.is_some()
    }

    /// OS process id of the running child.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().map(ProcessHandle::pid)
    }

    /// Output of `exiftool -ver`, captured at start.
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::NotRunning` when stopped.
    pub fn version(&mut self) -> Result<&str, ExifToolError> {
        if !self.running() {
            return Err(ExifToolError::NotRunning("Can't get ExifTool version"));
        }
        self.version
            .as_deref()
            .ok_or(ExifToolError::NotRunning("Can't get ExifTool version"))
    }

    /// Launch exiftool in stay-open mode and verify it speaks the status protocol.
    ///
    /// # Errors
    ///
    /// Returns a launch error if the executable cannot be started or exits
    /// at once, and `ExifToolError::ProtocolVersion` if the `-ver` query
    /// cannot be decoded. In both cases nothing is left running.
    pub async fn start(&mut self) -> Result<StartOutcome, ExifToolError> {
        if self.running() {
            tracing::debug!(pid = ?self.pid(), "start skipped, already running");
            self.logger.warn("Method 'start': ExifTool already running; doing nothing.");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let mut handle = ProcessHandle::spawn(&self.config)?;
        if handle.has_exited() {
            return Err(ExifToolError::ExitedImmediately);
        }
        let pid = handle.pid();
        self.handle = Some(handle);

        match self.query_version().await {
            Ok(version) => {
                tracing::debug!(pid, %version, "exiftool started");
                self.logger.info(&format!(
                    "Method 'start': Exiftool version '{version}' (pid {pid}) \
                     launched with args '{:?}'",
                    self.config.command_line()
                ));
                self.version = Some(version);
                Ok(StartOutcome::Started)
            }
            Err(err) => {
                self.abort_start().await;
                self.logger.error(&format!("Method 'start': {err}"));
                Err(err)
            }
        }
    }

    async fn query_version(&mut self) -> Result<String, ExifToolError> {
        let handle = self
            .handle
            .as_mut()
            .ok_or(ExifToolError::NotRunning("Cannot get version"))?;

        let (frame, payload) =
            handle.encode_batch(&[Param::from("-ver")], self.config.encoding())?;
        let response = handle
            .transact(&frame, &payload, self.config.block_size())
            .await
            .map_err(classify_startup_error)?;

        Ok(self
            .config
            .encoding()
            .decode(&response.stdout)
            .trim()
            .to_string())
    }

    async fn abort_start(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.shutdown(ABORTED_START_TIMEOUT).await {
                tracing::debug!(error = %e, "Failed to reap aborted exiftool");
            }
        }
        self.version = None;
    }

    /// Leave batch mode cleanly, force-killing after `timeout`.
    ///
    /// Calling this on a stopped supervisor is a no-op reported as
    /// [`TerminateOutcome::NotRunning`].
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::Io` if waiting on or killing the child fails.
    /// The supervisor is stopped either way.
    pub async fn terminate(
        &mut self,
        timeout: Duration,
    ) -> Result<TerminateOutcome, ExifToolError> {
        if !self.running() {
            tracing::debug!("terminate skipped, not running");
            self.logger.warn("Method 'terminate': ExifTool not running; doing nothing.");
            return Ok(TerminateOutcome::NotRunning);
        }

        let Some(handle) = self.handle.take() else {
            return Ok(TerminateOutcome::NotRunning);
        };
        self.version = None;

        let pid = handle.pid();
        let status = handle.shutdown(timeout).await?;
        tracing::debug!(pid, %status, "exiftool terminated");
        self.logger.info("Method 'terminate': Exiftool terminated successfully.");
        Ok(TerminateOutcome::Terminated)
    }

    /// Kill the child without the exit handshake.
    pub fn kill(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            tracing::debug!(pid = handle.pid(), "Killing exiftool");
            handle.kill_now();
        }
        self.version = None;
    }

    /// Run one batch on the live process.
    ///
    /// Parameters are encoded before anything is written; an unencodable
    /// batch is rejected and the child stays usable. A protocol failure
    /// leaves the pipes in an unknown state, so the child is killed before
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::NotRunning` if no process is live,
    /// `ExifToolError::Unencodable` for a parameter the encoding cannot
    /// represent, or `ExifToolError::Protocol` on a framing failure.
    pub async fn transact(&mut self, params: &[Param]) -> Result<Response, ExifToolError> {
        if !self.running() {
            return Err(ExifToolError::NotRunning("Cannot execute()"));
        }
        let encoding = self.config.encoding();
        let block_size = self.config.block_size();
        let Some(handle) = self.handle.as_mut() else {
            return Err(ExifToolError::NotRunning("Cannot execute()"));
        };

        let (frame, payload) = handle.encode_batch(params, encoding)?;
        match handle.transact(&frame, &payload, block_size).await {
            Ok(response) => Ok(response),
            Err(err) => {
                tracing::debug!(error = %err, "Protocol failure, killing exiftool");
                self.logger.error(&format!("Method 'execute': {err}"));
                self.kill();
                Err(err.into())
            }
        }
    }

    fn flag_not_running(&mut self) {
        self.handle = None;
        self.version = None;
    }

    fn ensure_stopped(&mut self, action: &'static str) -> Result<(), ExifToolError> {
        if self.running() {
            return Err(ExifToolError::Running(action));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Fails while running, or if the executable cannot be resolved.
    pub fn set_executable(&mut self, executable: impl AsRef<OsStr>) -> Result<(), ExifToolError> {
        self.ensure_stopped("Cannot set new executable")?;
        self.config.set_executable(executable)?;
        self.logger.info(&format!(
            "Property 'executable': set to \"{}\"",
            self.config.executable().display()
        ));
        Ok(())
    }

    /// # Errors
    ///
    /// Fails while running.
    pub fn set_common_args(&mut self, args: Vec<String>) -> Result<(), ExifToolError> {
        self.ensure_stopped("Cannot set new common_args")?;
        self.logger
            .info(&format!("Property 'common_args': set to \"{args:?}\""));
        self.config.set_common_args(args);
        Ok(())
    }

    /// # Errors
    ///
    /// Fails while running.
    pub fn set_config_file(
        &mut self,
        config_file: Option<ConfigFile>,
    ) -> Result<(), ExifToolError> {
        self.ensure_stopped("Cannot set a new config_file")?;
        self.logger
            .info(&format!("Property 'config_file': set to \"{config_file:?}\""));
        self.config.set_config_file(config_file);
        Ok(())
    }

    /// # Errors
    ///
    /// Fails while running.
    pub fn set_encoding(&mut self, encoding: Encoding) -> Result<(), ExifToolError> {
        self.ensure_stopped("Cannot set new encoding")?;
        self.config.set_encoding(encoding);
        Ok(())
    }

    /// # Errors
    ///
    /// Fails while running, or for a zero block size.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<(), ExifToolError> {
        self.ensure_stopped("Cannot set new block_size")?;
        self.config.set_block_size(block_size)?;
        self.logger
            .info(&format!("Property 'block_size': set to \"{block_size}\""));
        Ok(())
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.kill();
    }
}

/// A child that closed its pipes during the version query never really
/// started; anything else means it does not speak the status protocol.
fn classify_startup_error(err: ProtocolError) -> ExifToolError {
    match err {
        ProtocolError::StreamClosed { .. } => ExifToolError::ExitedImmediately,
        ProtocolError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            ExifToolError::ExitedImmediately
        }
        ProtocolError::Io(e) => ExifToolError::Io(e),
        other => ExifToolError::ProtocolVersion {
            minimum: EXIFTOOL_MINIMUM_VERSION,
            source: other,
        },
    }
}
