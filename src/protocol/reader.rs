//! Reading a pipe up to a marker.
//!
//! The child's pipes are tokio `ChildStdout`/`ChildStderr`. On Unix those
//! are non-blocking descriptors registered with the reactor, so each read
//! parks the task until the pipe is readable. Windows anonymous pipes have
//! no readiness notification; tokio performs a plain blocking read on its
//! blocking pool instead, which is correct but cannot be interrupted
//! mid-read.
//!
//! There is no timeout. A hung child blocks the reader until the process
//! is killed, at which point the pipe reports EOF.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ProtocolError;

/// Extra tail bytes inspected beyond the marker, covering trailing `\r\n` and spaces.
pub const TAIL_SLACK: usize = 4;

/// Read from `reader` until the whitespace-trimmed buffer ends with `suffix`.
///
/// Only the last `suffix.len() + TAIL_SLACK` bytes are checked after each read.
///
/// # Errors
///
/// Returns `ProtocolError::StreamClosed` if the pipe hits EOF first, or
/// `ProtocolError::Io` on a read failure.
pub async fn read_until_suffix<R>(
    reader: &mut R,
    suffix: &[u8],
    block_size: usize,
    stream: &'static str,
) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer = Vec::with_capacity(block_size);
    let mut chunk = vec![0u8; block_size.max(1)];

    while !tail_ends_with(&buffer, suffix) {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            tracing::debug!(stream, received = buffer.len(), "Pipe closed before marker");
            return Err(ProtocolError::StreamClosed { stream });
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    Ok(buffer)
}

/// Whether the trimmed tail of `buffer` ends with `suffix`.
#[must_use]
pub fn tail_ends_with(buffer: &[u8], suffix: &[u8]) -> bool {
    let start = buffer.len().saturating_sub(suffix.len() + TAIL_SLACK);
    buffer[start..].trim_ascii().ends_with(suffix)
}
