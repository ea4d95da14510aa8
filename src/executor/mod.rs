//! Executor: request/response cycles, status policy, JSON and resync layers.

mod builder;
mod exiftool;
mod json;
mod resync;
mod session;

pub use builder::*;
pub use exiftool::*;
pub use json::*;
pub use resync::*;
