//! Launch configuration for the resident exiftool process.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::error::ExifToolError;

use super::{ConfigFile, Encoding};

/// Executable looked up on `PATH` when none is given.
#[cfg(windows)]
pub const DEFAULT_EXECUTABLE: &str = "exiftool.exe";
/// Executable looked up on `PATH` when none is given.
#[cfg(not(windows))]
pub const DEFAULT_EXECUTABLE: &str = "exiftool";

/// Default read chunk size for the output pipes.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Common arguments applied when none are configured: group names, no print conversion.
pub const DEFAULT_COMMON_ARGS: [&str; 2] = ["-G", "-n"];

/// Flags that put exiftool into batch mode reading from stdin.
pub const STAY_OPEN_ARGS: [&str; 4] = ["-stay_open", "True", "-@", "-"];

/// Everything that shapes how the child is launched.
///
/// Owned by one supervisor; the supervisor rejects mutation while its
/// process is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    executable: PathBuf,
    common_args: Vec<String>,
    config_file: Option<ConfigFile>,
    encoding: Encoding,
    block_size: usize,
}

impl LaunchConfig {
    /// Create a config for the given executable with default settings.
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::ExecutableNotFound` if the executable cannot be resolved.
    pub fn new(executable: impl AsRef<OsStr>) -> Result<Self, ExifToolError> {
        Ok(Self {
            executable: resolve_executable(executable)?,
            common_args: DEFAULT_COMMON_ARGS.iter().map(|s| (*s).to_string()).collect(),
            config_file: None,
            encoding: Encoding::default(),
            block_size: DEFAULT_BLOCK_SIZE,
        })
    }

    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    #[must_use]
    pub fn common_args(&self) -> &[String] {
        &self.common_args
    }

    #[must_use]
    pub fn config_file(&self) -> Option<&ConfigFile> {
        self.config_file.as_ref()
    }

    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub(crate) fn set_executable(
        &mut self,
        executable: impl AsRef<OsStr>,
    ) -> Result<(), ExifToolError> {
        self.executable = resolve_executable(executable)?;
        Ok(())
    }

    pub(crate) fn set_common_args(&mut self, args: Vec<String>) {
        self.common_args = args;
    }

    pub(crate) fn set_config_file(&mut self, config_file: Option<ConfigFile>) {
        self.config_file = config_file;
    }

    pub(crate) fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    pub(crate) fn set_block_size(&mut self, block_size: usize) -> Result<(), ExifToolError> {
        if block_size == 0 {
            return Err(ExifToolError::InvalidBlockSize(block_size));
        }
        self.block_size = block_size;
        Ok(())
    }

    /// Full argument vector, executable first.
    ///
    /// Order is fixed: executable, `-config <path>` (exiftool only honours it
    /// as the first option), the stay-open flags, then `-common_args ...`.
    #[must_use]
    pub fn command_line(&self) -> Vec<OsString> {
        let mut argv = vec![self.executable.clone().into_os_string()];

        if let Some(config_file) = &self.config_file {
            argv.push("-config".into());
            argv.push(config_file.as_arg());
        }

        argv.extend(STAY_OPEN_ARGS.iter().map(OsString::from));

        if !self.common_args.is_empty() {
            argv.push("-common_args".into());
            argv.extend(self.common_args.iter().map(OsString::from));
        }

        argv
    }
}

/// Resolve an executable to an absolute path.
///
/// A path that exists on disk is used as is; anything else is looked up by
/// name on `PATH`.
///
/// # Errors
///
/// Returns `ExifToolError::ExecutableNotFound` if neither lookup succeeds.
pub fn resolve_executable(executable: impl AsRef<OsStr>) -> Result<PathBuf, ExifToolError> {
    let executable = executable.as_ref();
    let not_found = || ExifToolError::ExecutableNotFound(executable.to_string_lossy().into_owned());

    if executable.is_empty() {
        return Err(not_found());
    }

    let candidate = Path::new(executable);
    if candidate.exists() {
        return std::path::absolute(candidate).map_err(|_| not_found());
    }

    search_path(executable).ok_or_else(not_found)
}

fn search_path(name: &OsStr) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
