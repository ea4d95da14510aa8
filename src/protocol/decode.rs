//! Unframing of a completed batch.

use crate::error::ProtocolError;

use super::CommandFrame;

/// One decoded batch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Command output with the ready marker removed.
    pub stdout: Vec<u8>,
    /// Diagnostics printed before the status echo.
    pub stderr: Vec<u8>,
    /// Exit status echoed by exiftool.
    pub status: i32,
}

/// Strip the framing from raw pipe contents and extract the exit status.
///
/// # Errors
///
/// Returns a `ProtocolError` when either stream lacks its nonce-tagged
/// marker, the status echo is not delimited, or the status is not an integer.
pub fn decode(
    raw_stdout: &[u8],
    raw_stderr: &[u8],
    frame: &CommandFrame,
) -> Result<Response, ProtocolError> {
    let ready = frame.ready_marker();
    let stdout = raw_stdout
        .trim_ascii()
        .strip_suffix(ready.as_bytes())
        .ok_or(ProtocolError::MissingReadyMarker { marker: ready })?;

    let tag = frame.completion_tag();
    let body = raw_stderr
        .trim_ascii()
        .strip_suffix(tag.as_bytes())
        .ok_or(ProtocolError::MissingCompletionTag { tag })?;

    let (stderr, status) = split_status(body, frame.delimiter())?;

    Ok(Response {
        stdout: stdout.to_vec(),
        stderr: stderr.to_vec(),
        status,
    })
}

/// Split `<diagnostics><delim><status><delim>` into its parts.
fn split_status<'a>(body: &'a [u8], delimiter: &str) -> Result<(&'a [u8], i32), ProtocolError> {
    let delim = delimiter.as_bytes();
    let missing = |tail: &[u8]| ProtocolError::MissingStatusDelimiter {
        tail: String::from_utf8_lossy(tail).into_owned(),
        delimiter: delimiter.to_string(),
    };

    let Some(head) = body.strip_suffix(delim) else {
        let tail = &body[body.len().saturating_sub(delim.len())..];
        return Err(missing(tail));
    };

    let open = rfind(head, delim).ok_or_else(|| missing(head))?;
    let raw_status = &head[open + delim.len()..];

    let status = std::str::from_utf8(raw_status)
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
        .ok_or_else(|| ProtocolError::InvalidStatus {
            raw: String::from_utf8_lossy(raw_status).into_owned(),
        })?;

    Ok((&body[..open], status))
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
