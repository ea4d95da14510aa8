//! ExifTool Supervisor - a resident exiftool process driven in `-stay_open` batch mode.

pub mod config;
pub mod error;
pub mod executor;
pub mod helper;
pub mod logger;
pub mod process;
pub mod protocol;

pub use config::{ConfigFile, Encoding, LaunchConfig, Settings, SettingsLoader};
pub use error::{ExecuteError, ExifToolError, ProtocolError};
pub use executor::{ExecutionResult, ExifTool, ExifToolBuilder, Metadata};
pub use helper::{KeywordMode, TagValue};
pub use logger::{Logger, NoopLogger, SharedLogger, TracingLogger};
pub use process::{ProcessSupervisor, StartOutcome, TerminateOutcome};
pub use protocol::Param;
