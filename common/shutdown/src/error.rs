//! Errors produced while arming triggers or running a shutdown sequence.

use std::time::Duration;

use thiserror::Error;

/// Every error the coordinator produces. [`Arming`](ShutdownError::Arming) is returned from
/// [`GracefulShutdown::start`](crate::GracefulShutdown::start); all other variants are only
/// ever delivered to the installed [`ErrorHandler`](crate::ErrorHandler).
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// A shutdown manager failed to arm its event source.
    #[error("shutdown manager '{trigger}' failed to start: {source}")]
    Arming {
        trigger: String,
        source: anyhow::Error,
    },

    /// The pre-phase hook of the triggering manager failed.
    #[error("shutdown manager '{trigger}' failed in shutdown_start: {source}")]
    ShutdownStart {
        trigger: String,
        source: anyhow::Error,
    },

    /// A shutdown callback returned an error.
    #[error("shutdown callback triggered by '{trigger}' failed: {source}")]
    Callback {
        trigger: String,
        source: anyhow::Error,
    },

    /// A shutdown callback exceeded the configured callback timeout and was abandoned.
    #[error("shutdown callback triggered by '{trigger}' timed out after {timeout:?}")]
    CallbackTimeout { trigger: String, timeout: Duration },

    /// A shutdown callback panicked.
    #[error("shutdown callback triggered by '{trigger}' panicked")]
    CallbackPanicked { trigger: String },

    /// The post-phase hook of the triggering manager failed.
    #[error("shutdown manager '{trigger}' failed in shutdown_finished: {source}")]
    ShutdownFinished {
        trigger: String,
        source: anyhow::Error,
    },

    #[error("invalid signal name: {0}")]
    InvalidSignal(String),
}

impl ShutdownError {
    /// Short label for the error variant, used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ShutdownError::Arming { .. } => "arming",
            ShutdownError::ShutdownStart { .. } => "shutdown_start",
            ShutdownError::Callback { .. } => "callback",
            ShutdownError::CallbackTimeout { .. } => "callback_timeout",
            ShutdownError::CallbackPanicked { .. } => "callback_panicked",
            ShutdownError::ShutdownFinished { .. } => "shutdown_finished",
            ShutdownError::InvalidSignal(_) => "invalid_signal",
        }
    }

    /// Name of the manager whose sequence produced this error, if any.
    pub fn trigger(&self) -> Option<&str> {
        match self {
            ShutdownError::Arming { trigger, .. }
            | ShutdownError::ShutdownStart { trigger, .. }
            | ShutdownError::Callback { trigger, .. }
            | ShutdownError::CallbackTimeout { trigger, .. }
            | ShutdownError::CallbackPanicked { trigger }
            | ShutdownError::ShutdownFinished { trigger, .. } => Some(trigger),
            ShutdownError::InvalidSignal(_) => None,
        }
    }
}
