//! Metrics collection.
//!
//! # Metrics
//! - `fitsync_attempt_failures_total` (counter): failed attempts by context, transient
//! - `fitsync_recoveries_total` (counter): cache recoveries by context, cleared
//! - `fitsync_snapshot_cycles_total` (counter): cycle markers emitted
//! - `fitsync_snapshot_truncations_total` (counter): subtrees cut at the depth limit
//!
//! # Design Decisions
//! - Only the `metrics` facade is used; installing an exporter is left to the app
//! - Without a recorder installed every call is a no-op

pub fn record_attempt_failure(context: &str, transient: bool) {
    ::metrics::counter!(
        "fitsync_attempt_failures_total",
        "context" => context.to_string(),
        "transient" => transient.to_string()
    )
    .increment(1);
}

pub fn record_recovery(context: &str, cleared: bool) {
    ::metrics::counter!(
        "fitsync_recoveries_total",
        "context" => context.to_string(),
        "cleared" => cleared.to_string()
    )
    .increment(1);
}

pub fn record_snapshot_cycle() {
    ::metrics::counter!("fitsync_snapshot_cycles_total").increment(1);
}

pub fn record_snapshot_truncation() {
    ::metrics::counter!("fitsync_snapshot_truncations_total").increment(1);
}
