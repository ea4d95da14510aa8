//! Process tests against a scripted exiftool stand-in.
#![cfg(unix)]

mod executor_test;
mod lifecycle_test;

use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use exiftool_supervisor::{ExifTool, ExifToolBuilder, Logger};
use tempfile::TempDir;

const SCRIPT: &str = include_str!("../fixtures/fake_exiftool.sh");

/// Install the script once per test binary. Each test links to it from its
/// own directory, so marker files and logs stay per test.
fn installed_script() -> &'static Path {
    static SCRIPT_PATH: OnceLock<PathBuf> = OnceLock::new();
    SCRIPT_PATH.get_or_init(|| {
        let dir = Path::new(env!("CARGO_TARGET_TMPDIR"));
        let path = dir.join("fake_exiftool.sh");
        let staging = dir.join(format!("fake_exiftool.{}.tmp", std::process::id()));
        std::fs::write(&staging, SCRIPT).expect("Failed to write fake exiftool");
        std::fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to mark fake exiftool executable");
        std::fs::rename(&staging, &path).expect("Failed to install fake exiftool");
        path
    })
}

pub struct FakeExifTool {
    dir: TempDir,
    path: PathBuf,
}

impl FakeExifTool {
    pub fn install() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("exiftool");
        symlink(installed_script(), &path).expect("Failed to link fake exiftool");
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Switch on one of the script's marker-file behaviours.
    pub fn set_flag(&self, name: &str) {
        std::fs::write(self.dir.path().join(name), "").expect("Failed to write flag");
    }

    /// Arguments of the most recent launch.
    pub fn launch_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("launch-args"))
            .expect("Failed to read launch args")
            .lines()
            .map(String::from)
            .collect()
    }

    /// Every batch received, one token per entry.
    pub fn batches(&self) -> Vec<Vec<String>> {
        let raw = std::fs::read(self.dir.path().join("batches.log")).unwrap_or_default();
        String::from_utf8_lossy(&raw)
            .split("---\n")
            .filter(|b| !b.is_empty())
            .map(|b| b.lines().map(String::from).collect())
            .collect()
    }

    pub fn builder(&self) -> ExifToolBuilder {
        ExifTool::builder().executable(&self.path)
    }
}

/// Logger that keeps every message for inspection.
#[derive(Debug, Default)]
pub struct Recorder {
    pub infos: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn warnings_containing(&self, needle: &str) -> usize {
        self.warnings
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}

impl Logger for Recorder {
    fn debug(&self, _message: &str) {}

    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}
