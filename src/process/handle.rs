//! The live exiftool child and its three pipes.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use crate::config::{Encoding, LaunchConfig};
use crate::error::{ExifToolError, ProtocolError};
use crate::protocol::{
    decode, read_until_suffix, CommandFrame, Nonce, Param, Response, STAY_OPEN_EXIT,
};

use super::platform;

/// A launched exiftool process. Owned exclusively by a `ProcessSupervisor`.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    stderr: ChildStderr,
    pid: u32,
    last_nonce: Option<Nonce>,
    in_flight: bool,
}

impl ProcessHandle {
    /// Launch exiftool with all three standard streams piped.
    pub(crate) fn spawn(config: &LaunchConfig) -> Result<Self, ExifToolError> {
        let argv = config.command_line();

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        platform::configure(&mut cmd);

        let mut child = cmd.spawn().map_err(|e| {
            ExifToolError::from_launch_io(e, &config.executable().display().to_string())
        })?;

        let missing = || ExifToolError::Launch(std::io::Error::other("child pipe not captured"));
        let stdin = child.stdin.take().ok_or_else(missing)?;
        let stdout = child.stdout.take().ok_or_else(missing)?;
        let stderr = child.stderr.take().ok_or_else(missing)?;
        let pid = child.id().ok_or(ExifToolError::ExitedImmediately)?;

        tracing::debug!(pid, ?argv, "Spawned exiftool");

        Ok(Self {
            child,
            stdin,
            stdout,
            stderr,
            pid,
            last_nonce: None,
            in_flight: false,
        })
    }

    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Poll the OS for exit without blocking.
    pub(crate) fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(pid = self.pid, %status, "exiftool exited");
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::debug!(
                    pid = self.pid,
                    error = %e,
                    "try_wait failed, treating process as dead"
                );
                true
            }
        }
    }

    /// Pick a fresh nonce and encode a batch without touching the pipes.
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::Unencodable` if a parameter cannot be encoded.
    pub(crate) fn encode_batch(
        &mut self,
        params: &[Param],
        encoding: Encoding,
    ) -> Result<(CommandFrame, Vec<u8>), ExifToolError> {
        let nonce = Nonce::generate_after(self.last_nonce);
        self.last_nonce = Some(nonce);
        let frame = CommandFrame::new(nonce);
        let payload = frame.encode(params, encoding)?;
        Ok((frame, payload))
    }

    /// Send an encoded batch and read back its framed result.
    ///
    /// Stdout is drained to its ready marker before stderr is read: exiftool
    /// only echoes the status after the batch that produced stdout finished.
    pub(crate) async fn transact(
        &mut self,
        frame: &CommandFrame,
        payload: &[u8],
        block_size: usize,
    ) -> Result<Response, ProtocolError> {
        if self.in_flight {
            return Err(ProtocolError::Interrupted);
        }
        let nonce = frame.nonce();

        self.in_flight = true;
        self.stdin.write_all(payload).await?;
        self.stdin.flush().await?;
        tracing::debug!(pid = self.pid, %nonce, bytes = payload.len(), "Batch sent");

        let ready = frame.ready_marker();
        let raw_stdout =
            read_until_suffix(&mut self.stdout, ready.as_bytes(), block_size, "stdout").await?;
        let tag = frame.completion_tag();
        let raw_stderr =
            read_until_suffix(&mut self.stderr, tag.as_bytes(), block_size, "stderr").await?;
        self.in_flight = false;

        let response = decode(&raw_stdout, &raw_stderr, frame)?;
        tracing::debug!(
            pid = self.pid,
            %nonce,
            status = response.status,
            stdout_len = response.stdout.len(),
            stderr_len = response.stderr.len(),
            "Batch complete"
        );
        Ok(response)
    }

    /// Ask exiftool to leave batch mode, killing it if it outlives `timeout`.
    pub(crate) async fn shutdown(self, timeout: Duration) -> std::io::Result<ExitStatus> {
        let Self {
            mut child,
            mut stdin,
            stdout: _stdout,
            stderr: _stderr,
            pid,
            ..
        } = self;

        if let Err(e) = write_exit(&mut stdin).await {
            tracing::debug!(pid, error = %e, "Could not send -stay_open False");
        }
        drop(stdin);

        if let Ok(status) = tokio::time::timeout(timeout, child.wait()).await {
            status
        } else {
            tracing::warn!(pid, ?timeout, "exiftool did not exit in time, killing");
            child.kill().await?;
            child.wait().await
        }
    }

    /// Send SIGKILL (or `TerminateProcess`) without waiting.
    pub(crate) fn kill_now(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(pid = self.pid, error = %e, "start_kill failed");
        }
    }
}

async fn write_exit(stdin: &mut ChildStdin) -> std::io::Result<()> {
    stdin.write_all(STAY_OPEN_EXIT).await?;
    stdin.flush().await
}
