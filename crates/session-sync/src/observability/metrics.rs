//! Metrics definitions for the session synchronizer.
//!
//! All metrics follow Prometheus naming conventions:
//! - `session_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return the handle
/// the embedding application renders metrics from.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Device acquisition waits on the user agent and hardware
        .set_buckets_for_metric(
            Matcher::Prefix("session_device_switch".to_string()),
            &[
                0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set device switch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

/// Set the number of participants currently in the registry.
///
/// Metric: `session_participants_active`
pub fn set_participants_active(count: usize) {
    // usize to f64 conversion is safe for realistic room sizes
    #[allow(clippy::cast_precision_loss)]
    gauge!("session_participants_active").set(count as f64);
}

/// Record a decoded side-channel signal.
///
/// Metric: `session_signals_received_total`
/// Labels: `kind` (reaction, mute, unmute)
pub fn record_signal_received(kind: &'static str) {
    counter!("session_signals_received_total", "kind" => kind).increment(1);
}

/// Record a discarded side-channel payload.
///
/// Metric: `session_signals_dropped_total`
/// Labels: `reason` (malformed, missing_field, unknown_action,
/// unknown_reaction, not_listening)
pub fn record_signal_dropped(reason: &'static str) {
    counter!("session_signals_dropped_total", "reason" => reason).increment(1);
}

/// Record the result of a device switch.
///
/// Metric: `session_device_switch_total`
/// Labels: `kind`, `outcome` (switched, dropped, superseded, error)
pub fn record_device_switch(kind: &'static str, outcome: &'static str) {
    counter!(
        "session_device_switch_total",
        "kind" => kind,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record how long acquiring a new device track took.
///
/// Metric: `session_device_switch_duration_seconds`
/// Labels: `kind`
pub fn record_device_switch_duration(kind: &'static str, duration: Duration) {
    histogram!("session_device_switch_duration_seconds", "kind" => kind)
        .record(duration.as_secs_f64());
}

/// Record a processed session event.
///
/// Metric: `session_events_total`
/// Labels: `event`
pub fn record_session_event(event: &'static str) {
    counter!("session_events_total", "event" => event).increment(1);
}

/// Record a UI update that could not be delivered.
///
/// Metric: `session_updates_dropped_total`
pub fn record_update_dropped() {
    counter!("session_updates_dropped_total").increment(1);
}
