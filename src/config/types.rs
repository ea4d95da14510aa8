//! Configuration types.

use std::borrow::Cow;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExifToolError;

/// Text encoding used for every byte that crosses the pipes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl Encoding {
    /// Encode text for the child's stdin.
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::Unencodable` if `text` has a character the
    /// encoding cannot represent (above U+00FF for Latin-1).
    pub fn encode(self, text: &str) -> Result<Cow<'_, [u8]>, ExifToolError> {
        match self {
            Self::Utf8 => Ok(Cow::Borrowed(text.as_bytes())),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).ok())
                .collect::<Option<Vec<u8>>>()
                .map(Cow::Owned)
                .ok_or_else(|| ExifToolError::Unencodable {
                    param: text.to_string(),
                    encoding: self,
                }),
        }
    }

    /// Decode bytes read from the child. Invalid UTF-8 is replaced, not rejected.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Cow<'_, str> {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes),
            Self::Latin1 => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            other => Err(format!("unsupported encoding: {other}")),
        }
    }
}

/// The `-config` argument passed ahead of everything else at launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFile {
    /// An explicit empty path: exiftool skips its default config file.
    SkipDefault,
    /// A config file that existed when it was set.
    Path(PathBuf),
}

impl ConfigFile {
    /// Build from a path, treating the empty path as [`ConfigFile::SkipDefault`].
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::ConfigFileNotFound` if a non-empty path does not exist.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExifToolError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Ok(Self::SkipDefault);
        }
        if !path.exists() {
            return Err(ExifToolError::ConfigFileNotFound(path.to_path_buf()));
        }
        Ok(Self::Path(path.to_path_buf()))
    }

    pub(crate) fn as_arg(&self) -> OsString {
        match self {
            Self::SkipDefault => OsString::new(),
            Self::Path(path) => path.clone().into_os_string(),
        }
    }
}
