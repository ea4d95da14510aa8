//! Error types for the exiftool supervisor.

use std::path::PathBuf;

use crate::config::Encoding;

/// Minimum exiftool version that echoes `${status}` through `-echo4`.
pub const EXIFTOOL_MINIMUM_VERSION: &str = "12.15";

/// Top-level error type returned by the supervisor and executor.
#[derive(thiserror::Error, Debug)]
pub enum ExifToolError {
    /// An operation that requires a stopped process was attempted while running.
    #[error("ExifTool instance is running: {0}")]
    Running(&'static str),

    /// An operation that requires a live process was attempted while stopped.
    #[error("ExifTool instance not running: {0}")]
    NotRunning(&'static str),

    /// The executable could not be found on disk or on `PATH`.
    #[error("\"{0}\" is not found, on path or as absolute path")]
    ExecutableNotFound(String),

    /// The `-config` file does not exist.
    #[error("The config file could not be found: {0}")]
    ConfigFileNotFound(PathBuf),

    /// The OS refused to launch the executable.
    #[error("Failed to launch exiftool: {0}")]
    Launch(#[source] std::io::Error),

    /// Permission denied when launching the executable.
    #[error("Permission denied launching exiftool")]
    PermissionDenied,

    /// The child exited right after launch.
    #[error("exiftool did not execute successfully")]
    ExitedImmediately,

    /// The launched binary does not speak the status-echo batch protocol.
    #[error(
        "Error retrieving Exiftool info. Is your Exiftool version ('exiftool -ver') >= required version ('{minimum}')?"
    )]
    ProtocolVersion {
        minimum: &'static str,
        #[source]
        source: ProtocolError,
    },

    /// Framing failure while talking to a running process.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The command completed but its result was rejected.
    #[error(transparent)]
    Execute(#[from] ExecuteError),

    /// A block size of zero was requested.
    #[error("Block size doesn't make sense to be <= 0, got {0}")]
    InvalidBlockSize(usize),

    /// A tag name failed validation.
    #[error("Invalid Tag Name found: \"{0}\"")]
    TagName(String),

    /// A parameter has characters the configured encoding cannot represent.
    #[error("Parameter {param:?} cannot be encoded as {encoding}")]
    Unencodable { param: String, encoding: Encoding },

    /// A helper argument was empty or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExifToolError {
    /// Create an `ExifToolError` from a launch I/O error, classifying common cases.
    pub(crate) fn from_launch_io(err: std::io::Error, executable: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::ExecutableNotFound(executable.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Launch(err),
        }
    }

    /// Whether the error means the process must not be reused.
    #[must_use]
    pub fn is_fatal_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::ProtocolVersion { .. })
    }
}

/// Errors raised while framing or unframing a single batch.
#[derive(thiserror::Error, Debug)]
pub enum ProtocolError {
    /// Stdout did not end with the nonce-tagged ready marker.
    #[error("stdout did not end with the ready marker {marker}")]
    MissingReadyMarker { marker: String },

    /// Stderr did not end with the nonce-tagged completion tag.
    #[error("stderr did not end with the completion tag {tag}")]
    MissingCompletionTag { tag: String },

    /// The status echo was not wrapped in the expected delimiters.
    #[error("Exiftool expected to return status on stderr, but got unexpected character: {tail:?} != {delimiter:?}")]
    MissingStatusDelimiter { tail: String, delimiter: String },

    /// The text between the delimiters was not an integer.
    #[error("Exiftool returned a non-numeric exit status: {raw:?}")]
    InvalidStatus { raw: String },

    /// The pipe reached EOF before the marker arrived.
    #[error("{stream} closed before the batch completed")]
    StreamClosed { stream: &'static str },

    /// A previous batch was abandoned before its markers were read.
    #[error("a previous batch was abandoned mid-flight; the pipes are out of sync")]
    Interrupted,

    /// Pipe read or write failed.
    #[error("Pipe I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Diagnostics attached to every `ExecuteError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteContext {
    /// Exit status reported by exiftool.
    pub status: i32,
    /// Decoded stdout payload.
    pub stdout: String,
    /// Decoded stderr diagnostics.
    pub stderr: String,
    /// Parameters that were sent.
    pub params: Vec<String>,
}

/// Errors about the result of a completed batch.
#[derive(thiserror::Error, Debug)]
pub enum ExecuteError {
    /// Exiftool reported a nonzero exit status.
    #[error("execute returned a non-zero exit status: {}", .0.status)]
    NonZeroStatus(Box<ExecuteContext>),

    /// JSON output was requested but stdout was empty.
    #[error("execute_json expected output on stdout but got none")]
    OutputEmpty(Box<ExecuteContext>),

    /// Stdout was not valid JSON.
    #[error("execute_json received invalid JSON output from exiftool")]
    JsonInvalid {
        context: Box<ExecuteContext>,
        #[source]
        source: serde_json::Error,
    },

    /// The number of returned records differs from the number requested.
    #[error("exiftool returned {returned} results, but expected was {expected}")]
    ResultCountMismatch { returned: usize, expected: usize },

    /// A returned record belongs to a different file than requested.
    #[error("exiftool returned data for file {returned}, but expected was {requested}")]
    SourceFileMismatch { returned: String, requested: String },
}

impl ExecuteError {
    /// Diagnostics for the failed batch, when available.
    #[must_use]
    pub fn context(&self) -> Option<&ExecuteContext> {
        match self {
            Self::NonZeroStatus(ctx) | Self::OutputEmpty(ctx) => Some(ctx),
            Self::JsonInvalid { context, .. } => Some(context),
            Self::ResultCountMismatch { .. } | Self::SourceFileMismatch { .. } => None,
        }
    }
}
