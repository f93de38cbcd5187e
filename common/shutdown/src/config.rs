use std::str::FromStr;

use duration::HumanDuration;
use envconfig::Envconfig;
use tokio::signal::unix::SignalKind;

use crate::error::ShutdownError;
use crate::signals::parse_signal;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    /// Upper bound for each shutdown callback, e.g. `30s` or `1m30s`. Unset means no bound.
    #[envconfig(from = "SHUTDOWN_CALLBACK_TIMEOUT")]
    pub callback_timeout: Option<HumanDuration>,

    /// Run one shutdown sequence at a time; later triggers wait for the running one.
    #[envconfig(from = "SHUTDOWN_SERIALIZE_SEQUENCES", default = "false")]
    pub serialize_sequences: bool,

    #[envconfig(from = "SHUTDOWN_SIGNALS", default = "SIGINT,SIGTERM")]
    pub signals: SignalList,

    /// Exit the process once a signal-triggered sequence has finished.
    #[envconfig(from = "SHUTDOWN_EXIT_ON_FINISH", default = "true")]
    pub exit_on_finish: bool,
}

/// Comma separated list of signal names, e.g. `SIGINT,SIGTERM` or `hup, usr1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalList(pub Vec<SignalKind>);

impl FromStr for SignalList {
    type Err = ShutdownError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(parse_signal)
            .collect::<Result<Vec<_>, _>>()
            .map(SignalList)
    }
}
