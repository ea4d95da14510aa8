//! Status logging hook for callers.
//!
//! The executor reports launches, property changes and per-call traffic
//! through a [`Logger`]. The default is [`NoopLogger`]; [`TracingLogger`]
//! forwards everything to `tracing`.

use std::fmt;
use std::sync::Arc;

/// Narrow logging interface the executor depends on.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Forwards messages to `tracing` under the `exiftool` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "exiftool", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "exiftool", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "exiftool", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "exiftool", "{message}");
    }
}

/// Shared logger handle, cheap to clone between supervisor and executor.
#[derive(Clone)]
pub struct SharedLogger(Arc<dyn Logger>);

impl SharedLogger {
    #[must_use]
    pub fn new(logger: impl Logger + 'static) -> Self {
        Self(Arc::new(logger))
    }

    #[must_use]
    pub fn from_arc(logger: Arc<dyn Logger>) -> Self {
        Self(logger)
    }
}

impl Default for SharedLogger {
    fn default() -> Self {
        Self::new(NoopLogger)
    }
}

impl fmt::Debug for SharedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedLogger")
    }
}

impl std::ops::Deref for SharedLogger {
    type Target = dyn Logger;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
