//! Shutdown managers: the sources of termination events.

use std::sync::Arc;

use async_trait::async_trait;

use crate::coordinator::GracefulShutdown;

/// A named trigger that can start a shutdown sequence.
///
/// The coordinator calls [`start`](ShutdownManager::start) once while arming. When the
/// watched event fires, the manager calls
/// [`GracefulShutdown::start_shutdown`] with itself, and the coordinator then invokes
/// [`shutdown_start`](ShutdownManager::shutdown_start) and
/// [`shutdown_finished`](ShutdownManager::shutdown_finished) around the callback fan-out.
#[async_trait]
pub trait ShutdownManager: Send + Sync + 'static {
    /// Label passed to every callback of a sequence this manager initiates.
    /// Need not be unique across managers.
    fn name(&self) -> &str;

    /// Arm the event source and return. Must not wait for the event itself;
    /// spawn a listener task instead.
    async fn start(self: Arc<Self>, gs: GracefulShutdown) -> anyhow::Result<()>;

    /// Runs before any callback is dispatched.
    async fn shutdown_start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs after every callback has completed.
    async fn shutdown_finished(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
