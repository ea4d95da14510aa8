//! Exiftool process spawning, liveness tracking and shutdown.

mod handle;
mod platform;
mod supervisor;

pub use handle::*;
pub use supervisor::*;
