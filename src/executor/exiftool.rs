//! The executor: one request/response cycle at a time on a supervised process.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::time::Duration;

use crate::config::{ConfigFile, Encoding, LaunchConfig};
use crate::error::{ExecuteContext, ExecuteError, ExifToolError};
use crate::logger::SharedLogger;
use crate::process::{ProcessSupervisor, StartOutcome, TerminateOutcome};
use crate::protocol::{Param, Response};

use super::ExifToolBuilder;

/// Stdout, stderr and exit status of one batch.
///
/// Kept on the [`ExifTool`] after each call and not cleared on termination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: i32,
    encoding: Encoding,
}

impl ExecutionResult {
    #[must_use]
    pub fn new(response: Response, encoding: Encoding) -> Self {
        Self {
            stdout: response.stdout,
            stderr: response.stderr,
            status: response.status,
            encoding,
        }
    }

    #[must_use]
    pub fn stdout_text(&self) -> Cow<'_, str> {
        self.encoding.decode(&self.stdout)
    }

    #[must_use]
    pub fn stderr_text(&self) -> Cow<'_, str> {
        self.encoding.decode(&self.stderr)
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub(crate) fn context(&self, params: &[Param]) -> ExecuteContext {
        ExecuteContext {
            status: self.status,
            stdout: self.stdout_text().into_owned(),
            stderr: self.stderr_text().into_owned(),
            params: params.iter().map(Param::to_display).collect(),
        }
    }
}

/// A resident exiftool driven in `-stay_open` batch mode.
///
/// Every call takes `&mut self`: batches are strictly one at a time. Share
/// an instance across tasks behind a `tokio::sync::Mutex`.
#[derive(Debug)]
pub struct ExifTool {
    pub(super) supervisor: ProcessSupervisor,
    pub(super) last: Option<ExecutionResult>,
    pub(super) check_execute: bool,
    pub(super) check_tag_names: bool,
    pub(super) auto_start: bool,
    pub(super) resync: bool,
    pub(super) terminate_timeout: Duration,
    pub(super) logger: SharedLogger,
}

impl ExifTool {
    #[must_use]
    pub fn builder() -> ExifToolBuilder {
        ExifToolBuilder::new()
    }

    /// Default configuration with `exiftool` looked up on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::ExecutableNotFound` if exiftool is not installed.
    pub fn new() -> Result<Self, ExifToolError> {
        ExifToolBuilder::new().build()
    }

    /// # Errors
    ///
    /// See [`ProcessSupervisor::start`].
    pub async fn start(&mut self) -> Result<StartOutcome, ExifToolError> {
        self.supervisor.start().await
    }

    /// Stop using the configured terminate timeout.
    ///
    /// # Errors
    ///
    /// See [`ProcessSupervisor::terminate`].
    pub async fn terminate(&mut self) -> Result<TerminateOutcome, ExifToolError> {
        self.supervisor.terminate(self.terminate_timeout).await
    }

    /// # Errors
    ///
    /// See [`ProcessSupervisor::terminate`].
    pub async fn terminate_with_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<TerminateOutcome, ExifToolError> {
        self.supervisor.terminate(timeout).await
    }

    /// Kill the child without the exit handshake.
    pub fn kill(&mut self) {
        self.supervisor.kill();
    }

    pub fn running(&mut self) -> bool {
        self.supervisor.running()
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.supervisor.pid()
    }

    /// # Errors
    ///
    /// Returns `ExifToolError::NotRunning` when stopped.
    pub fn version(&mut self) -> Result<&str, ExifToolError> {
        self.supervisor.version()
    }

    #[must_use]
    pub fn config(&self) -> &LaunchConfig {
        self.supervisor.config()
    }

    /// Send one batch and return its result, whatever the exit status.
    ///
    /// Never starts the process and never checks the status.
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::NotRunning` if not started, or a protocol error.
    pub async fn run<I, P>(&mut self, params: I) -> Result<ExecutionResult, ExifToolError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        let params: Vec<Param> = params.into_iter().map(Into::into).collect();
        self.run_params(&params).await
    }

    pub(crate) async fn run_params(
        &mut self,
        params: &[Param],
    ) -> Result<ExecutionResult, ExifToolError> {
        let shown: Vec<String> = params.iter().map(Param::to_display).collect();
        let response = self.supervisor.transact(params).await?;
        let result = ExecutionResult::new(response, self.config().encoding());

        tracing::debug!(params = ?shown, status = result.status, "Batch completed");
        self.logger.info(&format!("run: command sent = {shown:?}"));
        self.logger
            .debug(&format!("run: stdout = \"{}\"", result.stdout_text()));
        self.logger
            .debug(&format!("run: stderr = \"{}\"", result.stderr_text()));
        self.logger.debug(&format!("run: status = {}", result.status));

        self.last = Some(result.clone());
        Ok(result)
    }

    /// Run a batch with auto-start and status checking applied.
    pub(crate) async fn execute_params(
        &mut self,
        params: &[Param],
    ) -> Result<ExecutionResult, ExifToolError> {
        if self.auto_start && !self.running() {
            self.start().await?;
        }

        let result = self.run_params(params).await?;
        if self.check_execute && !result.success() {
            return Err(ExecuteError::NonZeroStatus(Box::new(result.context(params))).into());
        }
        Ok(result)
    }

    /// Run a batch and return stdout as text.
    ///
    /// Starts the process first when `auto_start` is set, and fails on a
    /// nonzero status when `check_execute` is set.
    ///
    /// # Errors
    ///
    /// Returns `ExecuteError::NonZeroStatus` (when checked), or any error of [`ExifTool::run`].
    pub async fn execute<I, P>(&mut self, params: I) -> Result<String, ExifToolError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        let params: Vec<Param> = params.into_iter().map(Into::into).collect();
        let result = self.execute_params(&params).await?;
        Ok(result.stdout_text().into_owned())
    }

    /// Like [`ExifTool::execute`] but returns stdout undecoded.
    ///
    /// # Errors
    ///
    /// See [`ExifTool::execute`].
    pub async fn execute_bytes<I, P>(&mut self, params: I) -> Result<Vec<u8>, ExifToolError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        let params: Vec<Param> = params.into_iter().map(Into::into).collect();
        Ok(self.execute_params(&params).await?.stdout)
    }

    #[must_use]
    pub fn last_result(&self) -> Option<&ExecutionResult> {
        self.last.as_ref()
    }

    #[must_use]
    pub fn last_stdout(&self) -> Option<Cow<'_, str>> {
        self.last.as_ref().map(ExecutionResult::stdout_text)
    }

    #[must_use]
    pub fn last_stderr(&self) -> Option<Cow<'_, str>> {
        self.last.as_ref().map(ExecutionResult::stderr_text)
    }

    #[must_use]
    pub fn last_status(&self) -> Option<i32> {
        self.last.as_ref().map(|r| r.status)
    }

    #[must_use]
    pub fn check_execute(&self) -> bool {
        self.check_execute
    }

    pub fn set_check_execute(&mut self, enabled: bool) {
        self.check_execute = enabled;
    }

    #[must_use]
    pub fn check_tag_names(&self) -> bool {
        self.check_tag_names
    }

    pub fn set_check_tag_names(&mut self, enabled: bool) {
        self.check_tag_names = enabled;
    }

    #[must_use]
    pub fn auto_start(&self) -> bool {
        self.auto_start
    }

    #[must_use]
    pub fn resync(&self) -> bool {
        self.resync
    }

    pub fn set_resync(&mut self, enabled: bool) {
        self.resync = enabled;
    }

    /// Replace the status logger. Allowed while running.
    pub fn set_logger(&mut self, logger: SharedLogger) {
        self.supervisor.set_logger(logger.clone());
        self.logger = logger;
    }

    /// # Errors
    ///
    /// Fails while running, or if the executable cannot be resolved.
    pub fn set_executable(&mut self, executable: impl AsRef<OsStr>) -> Result<(), ExifToolError> {
        self.supervisor.set_executable(executable)
    }

    /// # Errors
    ///
    /// Fails while running.
    pub fn set_common_args<I, S>(&mut self, args: I) -> Result<(), ExifToolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supervisor
            .set_common_args(args.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Fails while running.
    pub fn set_config_file(
        &mut self,
        config_file: Option<ConfigFile>,
    ) -> Result<(), ExifToolError> {
        self.supervisor.set_config_file(config_file)
    }

    /// # Errors
    ///
    /// Fails while running.
    pub fn set_encoding(&mut self, encoding: Encoding) -> Result<(), ExifToolError> {
        self.supervisor.set_encoding(encoding)
    }

    /// # Errors
    ///
    /// Fails while running, or for a zero block size.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<(), ExifToolError> {
        self.supervisor.set_block_size(block_size)
    }
}
