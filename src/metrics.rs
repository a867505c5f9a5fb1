//! Prometheus metrics
//!
//! Counters for reconciliation outcomes and failures, and timings for every
//! call made to a ticketing system. Served by the webhook receiver at
//! `/metrics`.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

lazy_static! {
    /// Counter: reconciled events by direction and action taken
    pub static ref ACTIONS: CounterVec = register_counter_vec!(
        "ticketsync_actions_total",
        "Reconciled events by direction and action",
        &["direction", "action"]
    )
    .expect("Failed to create actions metric");

    /// Counter: failed events by direction and root error kind
    pub static ref ERRORS: CounterVec = register_counter_vec!(
        "ticketsync_errors_total",
        "Failed events by direction and error kind",
        &["direction", "kind"]
    )
    .expect("Failed to create errors metric");

    /// Histogram: outbound call duration (seconds)
    pub static ref REMOTE_CALL_DURATION: HistogramVec = register_histogram_vec!(
        "ticketsync_remote_call_duration_seconds",
        "Duration of calls to ticketing systems",
        &["system", "operation"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to create remote_call_duration metric");

    /// Counter: redeliveries of failed events
    pub static ref REDELIVERIES: CounterVec = register_counter_vec!(
        "ticketsync_redeliveries_total",
        "Redeliveries of failed events by direction",
        &["direction"]
    )
    .expect("Failed to create redeliveries metric");

    /// Gauge: receiver health status (1 = healthy, 0 = unhealthy)
    pub static ref HEALTH_STATUS: Gauge = register_gauge!(
        "ticketsync_health_status",
        "Receiver health status (1 = healthy, 0 = unhealthy)"
    )
    .expect("Failed to create health_status metric");
}

/// Record a reconciled event
pub fn record_action(direction: &str, action: &str) {
    ACTIONS.with_label_values(&[direction, action]).inc();
}

/// Record a failed event
pub fn record_error(direction: &str, kind: &str) {
    ERRORS.with_label_values(&[direction, kind]).inc();
}

/// Record an outbound call duration
pub fn record_remote_call(system: &str, operation: &str, duration_secs: f64) {
    REMOTE_CALL_DURATION
        .with_label_values(&[system, operation])
        .observe(duration_secs);
}

/// Record a redelivery
pub fn record_redelivery(direction: &str) {
    REDELIVERIES.with_label_values(&[direction]).inc();
}

/// Set health status
pub fn set_health_status(healthy: bool) {
    HEALTH_STATUS.set(if healthy { 1.0 } else { 0.0 });
}

/// Encode all metrics as Prometheus text format
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
