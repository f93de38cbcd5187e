//! Shutdown manager driven by POSIX signals.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use futures::future::select_all;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, info};

use crate::config::Config;
use crate::coordinator::GracefulShutdown;
use crate::error::ShutdownError;
use crate::manager::ShutdownManager;

/// Name reported by [`PosixSignalManager`] to shutdown callbacks.
pub const NAME: &str = "PosixSignalManager";

const KNOWN_SIGNALS: [(&str, fn() -> SignalKind); 6] = [
    ("SIGINT", SignalKind::interrupt),
    ("SIGTERM", SignalKind::terminate),
    ("SIGHUP", SignalKind::hangup),
    ("SIGQUIT", SignalKind::quit),
    ("SIGUSR1", SignalKind::user_defined1),
    ("SIGUSR2", SignalKind::user_defined2),
];

/// Signals watched when none are configured: SIGINT and SIGTERM.
pub fn default_signals() -> Vec<SignalKind> {
    vec![SignalKind::interrupt(), SignalKind::terminate()]
}

/// Parse a signal name, with or without the `SIG` prefix, ignoring case.
pub fn parse_signal(name: &str) -> Result<SignalKind, ShutdownError> {
    let upper = name.trim().to_ascii_uppercase();
    let full = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    KNOWN_SIGNALS
        .iter()
        .find(|(known, _)| *known == full)
        .map(|(_, kind)| kind())
        .ok_or_else(|| ShutdownError::InvalidSignal(name.to_string()))
}

fn signal_name(kind: SignalKind) -> String {
    KNOWN_SIGNALS
        .iter()
        .find(|(_, known)| known() == kind)
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| format!("signal {}", kind.as_raw_value()))
}

/// Triggers a shutdown sequence on the first of the configured signals, then exits the
/// process with status 0 once the sequence has finished.
///
/// The listener is single-shot: after the first signal it stops listening. The tokio
/// handlers stay installed for the rest of the process, so later deliveries of the same
/// signals no longer terminate the process by default.
pub struct PosixSignalManager {
    signals: Vec<SignalKind>,
    exit_on_finish: bool,
}

impl PosixSignalManager {
    /// Watch `signals`; an empty list falls back to [`default_signals`].
    pub fn new(signals: impl IntoIterator<Item = SignalKind>) -> Self {
        let mut signals: Vec<SignalKind> = signals.into_iter().collect();
        if signals.is_empty() {
            signals = default_signals();
        }
        Self {
            signals,
            exit_on_finish: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.signals.0.iter().copied()).with_exit_on_finish(config.exit_on_finish)
    }

    /// Disable to keep the process alive after the sequence, leaving exit to the caller.
    pub fn with_exit_on_finish(mut self, exit_on_finish: bool) -> Self {
        self.exit_on_finish = exit_on_finish;
        self
    }

    pub fn signals(&self) -> &[SignalKind] {
        &self.signals
    }
}

impl Default for PosixSignalManager {
    fn default() -> Self {
        Self::new(default_signals())
    }
}

/// Resolves with the index of the first stream that yields, or `None` if the
/// signal driver went away.
async fn wait_for_any(streams: &mut [Signal]) -> Option<usize> {
    let pending = streams.iter_mut().map(|stream| Box::pin(stream.recv()));
    let (received, index, _) = select_all(pending).await;
    received.map(|()| index)
}

#[async_trait]
impl ShutdownManager for PosixSignalManager {
    fn name(&self) -> &str {
        NAME
    }

    async fn start(self: Arc<Self>, gs: GracefulShutdown) -> anyhow::Result<()> {
        // Install handlers before returning so that a signal sent right after arming
        // is not lost.
        let mut streams = self
            .signals
            .iter()
            .map(|kind| {
                signal(*kind).with_context(|| {
                    format!("failed to install handler for {}", signal_name(*kind))
                })
            })
            .collect::<anyhow::Result<Vec<Signal>>>()?;

        debug!(
            signals = ?self.signals.iter().map(|kind| signal_name(*kind)).collect::<Vec<_>>(),
            "Shutdown: signal handlers installed"
        );

        tokio::spawn(async move {
            let Some(index) = wait_for_any(&mut streams).await else {
                debug!("Shutdown: signal driver stopped before any signal arrived");
                return;
            };
            drop(streams);
            info!(
                signal = %signal_name(self.signals[index]),
                "Shutdown: received signal"
            );
            gs.start_shutdown(self).await;
        });

        Ok(())
    }

    async fn shutdown_finished(&self) -> anyhow::Result<()> {
        if self.exit_on_finish {
            info!("Shutdown: sequence finished, exiting process");
            std::process::exit(0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signal_accepts_common_spellings() {
        assert_eq!(parse_signal("SIGINT").unwrap(), SignalKind::interrupt());
        assert_eq!(parse_signal("term").unwrap(), SignalKind::terminate());
        assert_eq!(parse_signal(" SigHup ").unwrap(), SignalKind::hangup());
        assert_eq!(parse_signal("QUIT").unwrap(), SignalKind::quit());
        assert_eq!(parse_signal("usr2").unwrap(), SignalKind::user_defined2());
    }

    #[test]
    fn test_parse_signal_rejects_unknown() {
        assert!(matches!(
            parse_signal("SIGKILL"),
            Err(ShutdownError::InvalidSignal(name)) if name == "SIGKILL"
        ));
        assert!(parse_signal("").is_err());
    }

    #[test]
    fn test_empty_signal_list_defaults_to_int_and_term() {
        let manager = PosixSignalManager::new(Vec::new());
        assert_eq!(
            manager.signals(),
            &[SignalKind::interrupt(), SignalKind::terminate()]
        );
        assert_eq!(manager.name(), NAME);
    }

    #[test]
    fn test_configured_signals_are_kept_in_order() {
        let manager =
            PosixSignalManager::new([SignalKind::user_defined2(), SignalKind::hangup()]);
        assert_eq!(
            manager.signals(),
            &[SignalKind::user_defined2(), SignalKind::hangup()]
        );
    }

    #[test]
    fn test_signal_name() {
        assert_eq!(signal_name(SignalKind::terminate()), "SIGTERM");
        assert_eq!(signal_name(SignalKind::from_raw(34)), "signal 34");
    }

    #[tokio::test]
    async fn test_shutdown_start_is_noop_and_finish_respects_exit_flag() {
        let manager = PosixSignalManager::default().with_exit_on_finish(false);
        assert!(manager.shutdown_start().await.is_ok());
        assert!(manager.shutdown_finished().await.is_ok());
    }
}
