//! Configuration module.

mod launch;
mod loader;
mod types;

pub use launch::*;
pub use loader::*;
pub use types::*;
