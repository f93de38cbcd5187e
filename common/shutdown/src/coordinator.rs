//! The graceful shutdown coordinator: registration, arming and the two-phase sequence.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::callback::ShutdownCallback;
use crate::config::Config;
use crate::error::ShutdownError;
use crate::error_handler::ErrorHandler;
use crate::manager::ShutdownManager;
use crate::metrics;

/// Coordinates shutdown managers, shutdown callbacks and the error handler.
///
/// Cheap to clone; all clones share the same registrations. Managers receive a clone in
/// [`ShutdownManager::start`] and hand themselves back through
/// [`start_shutdown`](GracefulShutdown::start_shutdown) when their event fires.
///
/// By default nothing serializes overlapping sequences: two managers firing at once run
/// two independent fan-outs over the same callbacks. Enable
/// [`with_serialized_sequences`](GracefulShutdownBuilder::with_serialized_sequences) to
/// run them one after the other instead.
#[derive(Clone)]
pub struct GracefulShutdown {
    inner: Arc<Inner>,
}

struct Inner {
    managers: RwLock<Vec<Arc<dyn ShutdownManager>>>,
    callbacks: RwLock<Vec<Arc<dyn ShutdownCallback>>>,
    error_handler: RwLock<Option<Arc<dyn ErrorHandler>>>,
    callback_timeout: Option<Duration>,
    sequence_lock: Option<Mutex<()>>,
    sequence_counter: AtomicU64,
}

/// Builder for [`GracefulShutdown`]; obtain with [`GracefulShutdown::builder`].
#[derive(Default)]
pub struct GracefulShutdownBuilder {
    callback_timeout: Option<Duration>,
    serialize_sequences: bool,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl GracefulShutdownBuilder {
    /// Abandon any callback still running after `d` and report
    /// [`ShutdownError::CallbackTimeout`]. Without it a hung callback blocks the sequence forever.
    pub fn with_callback_timeout<D>(mut self, d: D) -> Self
    where
        D: TryInto<Duration>,
    {
        self.callback_timeout = d.try_into().ok();
        self
    }

    /// Queue sequences so that at most one runs at a time.
    pub fn with_serialized_sequences(mut self, serialize: bool) -> Self {
        self.serialize_sequences = serialize;
        self
    }

    pub fn with_error_handler(mut self, handler: impl ErrorHandler) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> GracefulShutdown {
        GracefulShutdown {
            inner: Arc::new(Inner {
                managers: RwLock::new(Vec::new()),
                callbacks: RwLock::new(Vec::new()),
                error_handler: RwLock::new(self.error_handler),
                callback_timeout: self.callback_timeout,
                sequence_lock: self.serialize_sequences.then(|| Mutex::new(())),
                sequence_counter: AtomicU64::new(0),
            }),
        }
    }
}

impl GracefulShutdown {
    /// A coordinator with no managers, no callbacks and no error handler.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> GracefulShutdownBuilder {
        GracefulShutdownBuilder::default()
    }

    /// Apply the callback timeout and sequence serialization from `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut builder =
            Self::builder().with_serialized_sequences(config.serialize_sequences);
        if let Some(timeout) = config.callback_timeout {
            builder = builder.with_callback_timeout(timeout.0);
        }
        builder.build()
    }

    pub fn add_shutdown_manager(&self, manager: Arc<dyn ShutdownManager>) {
        debug!(manager = manager.name(), "Shutdown: manager registered");
        self.inner
            .managers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(manager);
    }

    /// Register a callback. A callback added while a sequence is already fanning out is
    /// not part of that sequence.
    pub fn add_shutdown_callback(&self, callback: Arc<dyn ShutdownCallback>) {
        let mut callbacks = self
            .inner
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        callbacks.push(callback);
        debug!(callbacks = callbacks.len(), "Shutdown: callback registered");
    }

    /// Replace the error handler. The last handler set wins.
    pub fn set_error_handler(&self, handler: impl ErrorHandler) {
        *self
            .inner
            .error_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    /// Arm every registered manager in registration order. Stops at the first manager
    /// that fails; managers after it are never started.
    pub async fn start(&self) -> Result<(), ShutdownError> {
        let managers = self
            .inner
            .managers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for manager in managers {
            let name = manager.name().to_string();
            if let Err(source) = manager.start(self.clone()).await {
                warn!(manager = %name, "Shutdown: manager failed to start: {source:#}");
                return Err(ShutdownError::Arming {
                    trigger: name,
                    source,
                });
            }
            info!(manager = %name, "Shutdown: manager armed");
        }

        Ok(())
    }

    /// Run the shutdown sequence for `manager`:
    ///
    /// 1. `manager.shutdown_start()`
    /// 2. every registered callback, concurrently, with `manager.name()`
    /// 3. wait for all callbacks
    /// 4. `manager.shutdown_finished()`
    ///
    /// Every failure goes to [`report_error`](GracefulShutdown::report_error); none of them
    /// stops the sequence.
    pub async fn start_shutdown(&self, manager: Arc<dyn ShutdownManager>) {
        let _serialized = match &self.inner.sequence_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let sequence = self.inner.sequence_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let trigger = manager.name().to_string();
        let span = info_span!("shutdown", trigger = %trigger, sequence);

        self.run_sequence(manager, trigger).instrument(span).await
    }

    async fn run_sequence(&self, manager: Arc<dyn ShutdownManager>, trigger: String) {
        let clock = Instant::now();
        metrics::emit_sequence_started(&trigger);
        info!("Shutdown: sequence started");

        let mut clean = true;

        if let Err(source) = manager.shutdown_start().await {
            clean = false;
            self.report_error(ShutdownError::ShutdownStart {
                trigger: trigger.clone(),
                source,
            });
        }

        let callbacks = self
            .inner
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let dispatched = callbacks.len();

        let mut tasks = JoinSet::new();
        for callback in callbacks {
            let gs = self.clone();
            let trigger = trigger.clone();
            tasks.spawn(
                async move { gs.run_callback(callback, trigger).await }.in_current_span(),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => {}
                Ok(false) => clean = false,
                Err(join_error) if join_error.is_panic() => {
                    clean = false;
                    self.report_error(ShutdownError::CallbackPanicked {
                        trigger: trigger.clone(),
                    });
                }
                Err(join_error) => {
                    // Only happens when the runtime itself is shutting down.
                    clean = false;
                    debug!("Shutdown: callback task cancelled: {join_error}");
                }
            }
        }

        info!(
            callbacks = dispatched,
            duration_secs = clock.elapsed().as_secs_f64(),
            "Shutdown: all callbacks finished"
        );

        if let Err(source) = manager.shutdown_finished().await {
            clean = false;
            self.report_error(ShutdownError::ShutdownFinished {
                trigger: trigger.clone(),
                source,
            });
        }

        metrics::emit_sequence_completed(&trigger, clean);
        if clean {
            info!(
                clean,
                total_duration_secs = clock.elapsed().as_secs_f64(),
                "Shutdown: sequence complete"
            );
        } else {
            warn!(
                clean,
                total_duration_secs = clock.elapsed().as_secs_f64(),
                "Shutdown: sequence complete with failures"
            );
        }
    }

    /// Runs one callback and reports its failure straight away. Returns whether it succeeded.
    async fn run_callback(&self, callback: Arc<dyn ShutdownCallback>, trigger: String) -> bool {
        let clock = Instant::now();
        let result = match self.inner.callback_timeout {
            Some(timeout) => {
                match tokio::time::timeout(timeout, callback.on_shutdown(&trigger)).await {
                    Ok(result) => result.map_err(|source| ShutdownError::Callback {
                        trigger: trigger.clone(),
                        source,
                    }),
                    Err(_) => Err(ShutdownError::CallbackTimeout {
                        trigger: trigger.clone(),
                        timeout,
                    }),
                }
            }
            None => callback
                .on_shutdown(&trigger)
                .await
                .map_err(|source| ShutdownError::Callback {
                    trigger: trigger.clone(),
                    source,
                }),
        };

        let outcome = match &result {
            Ok(()) => "completed",
            Err(ShutdownError::CallbackTimeout { .. }) => "timeout",
            Err(_) => "failed",
        };
        let elapsed = clock.elapsed();
        metrics::emit_callback_duration(&trigger, outcome, elapsed.as_secs_f64());
        debug!(
            result = outcome,
            duration_secs = elapsed.as_secs_f64(),
            "Shutdown: callback finished"
        );

        match result {
            Ok(()) => true,
            Err(err) => {
                self.report_error(err);
                false
            }
        }
    }

    /// Hand `err` to the error handler, if one is set. Without a handler the error is only
    /// logged.
    ///
    /// A panic in the handler is caught and logged here; it never unwinds into the caller.
    pub fn report_error(&self, err: ShutdownError) {
        let kind = err.kind();
        metrics::emit_error(kind);
        warn!(kind, "Shutdown: {err}");

        let handler = self
            .inner
            .error_handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            if panic::catch_unwind(AssertUnwindSafe(|| handler.handle_error(err))).is_err() {
                warn!(kind, "Shutdown: error handler panicked");
            }
        }
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}
