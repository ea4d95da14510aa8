//! Outbound command frames.
//!
//! A frame is the newline-joined parameter list followed by an `-echo4`
//! status directive and a nonce-tagged `-execute`. The nonce ties the
//! stdout ready marker and the stderr completion tag to this one call.

use std::borrow::Cow;
use std::ffi::OsString;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::config::Encoding;
use crate::error::ExifToolError;

/// Default delimiter wrapped around the echoed status.
pub const STATUS_DELIMITER: &str = "=";

/// Exiftool's placeholder for the exit status of the batch (12.10+).
pub const STATUS_PLACEHOLDER: &str = "${status}";

/// Directive that echoes its argument to stderr after the batch runs.
pub const ECHO_STATUS_DIRECTIVE: &str = "-echo4";

/// Sequence that asks a stay-open exiftool to exit.
pub const STAY_OPEN_EXIT: &[u8] = b"-stay_open\nFalse\n";

const NONCE_RANGE: RangeInclusive<u32> = 100_000..=999_999;

/// Random six-digit number tagging one call's markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce(u32);

impl Nonce {
    /// Draw a nonce uniformly from the six-digit range.
    #[must_use]
    pub fn generate() -> Self {
        Self(rand::thread_rng().gen_range(NONCE_RANGE))
    }

    /// Draw a nonce that differs from `previous`.
    #[must_use]
    pub fn generate_after(previous: Option<Nonce>) -> Self {
        loop {
            let nonce = Self::generate();
            if Some(nonce) != previous {
                return nonce;
            }
        }
    }

    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One parameter token: either text, encoded at the frame boundary, or raw bytes sent verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    Bytes(Vec<u8>),
}

impl Param {
    /// # Errors
    ///
    /// Returns `ExifToolError::Unencodable` for text the encoding cannot represent.
    pub fn encode(&self, encoding: Encoding) -> Result<Cow<'_, [u8]>, ExifToolError> {
        match self {
            Self::Text(text) => encoding.encode(text),
            Self::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }

    /// Lossy text form for logs and error context.
    #[must_use]
    pub fn to_display(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for Param {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<Vec<u8>> for Param {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Param {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<&Path> for Param {
    fn from(value: &Path) -> Self {
        Self::from(value.as_os_str().to_owned())
    }
}

impl From<PathBuf> for Param {
    fn from(value: PathBuf) -> Self {
        Self::from(value.into_os_string())
    }
}

impl From<OsString> for Param {
    fn from(value: OsString) -> Self {
        match value.into_string() {
            Ok(text) => Self::Text(text),
            Err(raw) => Self::Bytes(raw.into_encoded_bytes()),
        }
    }
}

/// Convert anything param-like into a `Vec<Param>`.
pub fn params<I, P>(items: I) -> Vec<Param>
where
    I: IntoIterator<Item = P>,
    P: Into<Param>,
{
    items.into_iter().map(Into::into).collect()
}

/// Markers for a single call. Built fresh per call and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    nonce: Nonce,
    delimiter: String,
}

impl CommandFrame {
    #[must_use]
    pub fn new(nonce: Nonce) -> Self {
        Self {
            nonce,
            delimiter: STATUS_DELIMITER.to_string(),
        }
    }

    /// Use a custom status delimiter. An empty delimiter falls back to the default.
    #[must_use]
    pub fn with_delimiter(nonce: Nonce, delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Self::new(nonce);
        }
        Self { nonce, delimiter }
    }

    #[must_use]
    pub fn nonce(&self) -> Nonce {
        self.nonce
    }

    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// `-execute<nonce>\n`
    #[must_use]
    pub fn execute_marker(&self) -> String {
        format!("-execute{}\n", self.nonce)
    }

    /// `{ready<nonce>}`, appended to stdout by exiftool.
    #[must_use]
    pub fn ready_marker(&self) -> String {
        format!("{{ready{}}}", self.nonce)
    }

    /// `post<nonce>`, the literal closing the stderr status line.
    #[must_use]
    pub fn completion_tag(&self) -> String {
        format!("post{}", self.nonce)
    }

    /// `<delim>${status}<delim>post<nonce>`
    #[must_use]
    pub fn status_template(&self) -> String {
        format!(
            "{d}{STATUS_PLACEHOLDER}{d}{tag}",
            d = self.delimiter,
            tag = self.completion_tag()
        )
    }

    /// Build the bytes written to exiftool's stdin for this call.
    ///
    /// Nothing is produced unless every token encodes.
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::Unencodable` for the first token the encoding
    /// cannot represent.
    pub fn encode(&self, params: &[Param], encoding: Encoding) -> Result<Vec<u8>, ExifToolError> {
        let template = self.status_template();
        let execute = self.execute_marker();

        let mut tokens = params
            .iter()
            .map(|p| p.encode(encoding))
            .collect::<Result<Vec<Cow<'_, [u8]>>, _>>()?;
        tokens.push(Cow::Borrowed(ECHO_STATUS_DIRECTIVE.as_bytes()));
        tokens.push(encoding.encode(&template)?);
        tokens.push(encoding.encode(&execute)?);

        Ok(tokens.join(&b'\n'))
    }
}
