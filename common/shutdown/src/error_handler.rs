use tracing::error;

use crate::error::ShutdownError;

/// Observer for every error reported during a shutdown sequence.
///
/// Any `Fn(ShutdownError)` closure is an error handler.
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle_error(&self, err: ShutdownError);
}

impl<F> ErrorHandler for F
where
    F: Fn(ShutdownError) + Send + Sync + 'static,
{
    fn handle_error(&self, err: ShutdownError) {
        self(err)
    }
}

/// Error handler that logs each error at `error` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn handle_error(&self, err: ShutdownError) {
        error!(
            kind = err.kind(),
            trigger = err.trigger().unwrap_or_default(),
            "Shutdown: {err:#}"
        );
    }
}
