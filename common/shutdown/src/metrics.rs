pub(crate) const METRIC_SEQUENCE_STARTED: &str = "shutdown_sequence_started_total";
pub(crate) const METRIC_SEQUENCE_COMPLETED: &str = "shutdown_sequence_completed_total";
pub(crate) const METRIC_CALLBACK_DURATION: &str = "shutdown_callback_duration_seconds";
pub(crate) const METRIC_ERRORS: &str = "shutdown_errors_total";

pub(crate) fn emit_sequence_started(trigger: &str) {
    metrics::counter!(
        METRIC_SEQUENCE_STARTED,
        "trigger" => trigger.to_string()
    )
    .increment(1);
}

pub(crate) fn emit_sequence_completed(trigger: &str, clean: bool) {
    metrics::counter!(
        METRIC_SEQUENCE_COMPLETED,
        "trigger" => trigger.to_string(),
        "clean" => clean.to_string()
    )
    .increment(1);
}

pub(crate) fn emit_callback_duration(trigger: &str, result: &str, duration_secs: f64) {
    metrics::histogram!(
        METRIC_CALLBACK_DURATION,
        "trigger" => trigger.to_string(),
        "result" => result.to_string()
    )
    .record(duration_secs);
}

pub(crate) fn emit_error(kind: &'static str) {
    metrics::counter!(METRIC_ERRORS, "kind" => kind).increment(1);
}
