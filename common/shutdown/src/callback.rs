use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

/// A unit of cleanup work, invoked once per shutdown sequence with the name of the
/// manager that triggered it.
///
/// Callbacks of a sequence run concurrently with each other. Anything a callback
/// shares with other callbacks must be synchronized by the callback itself.
#[async_trait]
pub trait ShutdownCallback: Send + Sync + 'static {
    async fn on_shutdown(&self, manager_name: &str) -> anyhow::Result<()>;
}

/// Adapter that turns an async closure into a [`ShutdownCallback`]. Build with [`shutdown_fn`].
pub struct ShutdownFn<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

/// Wrap `f` as a callback. The closure receives the triggering manager's name.
///
/// ```
/// use shutdown::shutdown_fn;
///
/// let callback = shutdown_fn(|manager: String| async move {
///     tracing::info!(%manager, "flushing buffers");
///     anyhow::Ok(())
/// });
/// # drop(callback);
/// ```
pub fn shutdown_fn<F, Fut>(f: F) -> ShutdownFn<F, Fut>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    ShutdownFn {
        f,
        _fut: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> ShutdownCallback for ShutdownFn<F, Fut>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn on_shutdown(&self, manager_name: &str) -> anyhow::Result<()> {
        (self.f)(manager_name.to_string()).await
    }
}
