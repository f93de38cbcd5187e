//! Graceful shutdown coordination: shutdown managers (termination triggers such as POSIX
//! signals) and shutdown callbacks (independent cleanup actions) registered on one
//! [`GracefulShutdown`] coordinator.
//!
//! When any manager fires, the coordinator runs its pre-phase hook, fans out every
//! callback concurrently, waits for all of them, then runs the post-phase hook. Errors
//! never abort the sequence; they are handed to the optional [`ErrorHandler`].
//!
//! Unix only: signals are [`SignalKind`]s from `tokio::signal::unix`.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use shutdown::{shutdown_fn, GracefulShutdown, LogErrorHandler, PosixSignalManager};
//!
//! # async fn run() -> Result<(), shutdown::ShutdownError> {
//! let gs = GracefulShutdown::new();
//! gs.add_shutdown_manager(Arc::new(PosixSignalManager::default()));
//! gs.add_shutdown_callback(Arc::new(shutdown_fn(|manager: String| async move {
//!     tracing::info!(%manager, "closing connections");
//!     anyhow::Ok(())
//! })));
//! gs.set_error_handler(LogErrorHandler);
//! gs.start().await?;
//! # Ok(())
//! # }
//! ```

mod callback;
mod config;
mod coordinator;
mod error;
mod error_handler;
mod manager;
mod metrics;
mod signals;

pub use callback::{shutdown_fn, ShutdownCallback, ShutdownFn};
pub use config::{Config, SignalList};
pub use coordinator::{GracefulShutdown, GracefulShutdownBuilder};
pub use error::ShutdownError;
pub use error_handler::{ErrorHandler, LogErrorHandler};
pub use manager::ShutdownManager;
pub use signals::{default_signals, parse_signal, PosixSignalManager, NAME as POSIX_SIGNAL_MANAGER_NAME};

pub use tokio::signal::unix::SignalKind;
