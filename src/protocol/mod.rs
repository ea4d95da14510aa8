//! Batch-mode wire protocol: frame encoding, marker-bounded reads and response decoding.

mod decode;
mod frame;
mod reader;

pub use decode::*;
pub use frame::*;
pub use reader::*;
