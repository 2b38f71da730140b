//! Metrics definitions for the Meeting Hub.
//!
//! All metrics follow Prometheus naming conventions:
//! - `hub_` prefix
//! - `_total` suffix for counters
//!
//! | Metric | Type | Labels |
//! |---|---|---|
//! | `hub_meetings_active` | gauge | none |
//! | `hub_clients_connected` | gauge | none |
//! | `hub_meetings_created_total` | counter | none |
//! | `hub_meetings_reclaimed_total` | counter | none |
//! | `hub_messages_broadcast_total` | counter | none |
//! | `hub_backpressure_drops_total` | counter | none |
//! | `hub_restricted_actions_rejected_total` | counter | none |
//! | `hub_store_errors_total` | counter | `operation` (create, delete) |
//!
//! Recording is a no-op until a recorder is installed, so unit tests never
//! need one.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder and return the handle
/// used to render `/metrics`.
///
/// # Errors
///
/// Returns error if a recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

/// Set the number of meetings in the registry.
///
/// Metric: `hub_meetings_active`
pub fn set_meetings_active(count: usize) {
    // usize to f64 conversion is safe for realistic meeting counts (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    gauge!("hub_meetings_active").set(count as f64);
}

/// Metric: `hub_meetings_created_total`
pub fn record_meeting_created() {
    counter!("hub_meetings_created_total").increment(1);
}

/// Metric: `hub_meetings_reclaimed_total`
pub fn record_meeting_reclaimed() {
    counter!("hub_meetings_reclaimed_total").increment(1);
}

/// A client registered with a hub.
///
/// Metric: `hub_clients_connected`
pub fn record_client_connected() {
    gauge!("hub_clients_connected").increment(1.0);
}

/// A client was removed from a hub, for any reason.
///
/// Metric: `hub_clients_connected`
pub fn record_client_disconnected() {
    gauge!("hub_clients_connected").decrement(1.0);
}

/// Record one broadcast and the number of queues it reached.
///
/// Metric: `hub_messages_broadcast_total`
pub fn record_broadcast(recipients: usize) {
    counter!("hub_messages_broadcast_total").increment(recipients as u64);
}

/// A client was dropped because its outbound queue was full.
///
/// Metric: `hub_backpressure_drops_total`
pub fn record_backpressure_drop() {
    counter!("hub_backpressure_drops_total").increment(1);
}

/// A non-moderator attempted a restricted action.
///
/// Metric: `hub_restricted_actions_rejected_total`
pub fn record_restricted_action_rejected() {
    counter!("hub_restricted_actions_rejected_total").increment(1);
}

/// A persistence gateway call failed.
///
/// Metric: `hub_store_errors_total`
/// Labels: `operation`
pub fn record_store_error(operation: &'static str) {
    counter!("hub_store_errors_total", "operation" => operation).increment(1);
}
