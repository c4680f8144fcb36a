// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for search-odm.
//!
//! Uses the `metrics` crate facade. The embedding application installs
//! the exporter (Prometheus, OTEL, etc.).
//!
//! # Metric Naming Convention
//! - `search_odm_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `method`: GET, HEAD, PUT, POST, DELETE
//! - `operation`: save, get, search, scroll, bulk, create_index, ...
//! - `status`: success, error, or the HTTP status class (2xx, 4xx, 5xx)

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

/// Record an HTTP exchange that produced a response
pub fn record_request(method: &str, status: u16) {
    counter!(
        "search_odm_requests_total",
        "method" => method.to_string(),
        "status" => status_class(status)
    )
    .increment(1);
}

/// Record HTTP round-trip latency, retries included
pub fn record_request_latency(method: &str, duration: Duration) {
    histogram!(
        "search_odm_request_seconds",
        "method" => method.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a request that never got a response (connection, timeout, open circuit)
pub fn record_transport_error(method: &str) {
    counter!(
        "search_odm_transport_errors_total",
        "method" => method.to_string()
    )
    .increment(1);
}

/// Record circuit breaker call
pub fn record_circuit_breaker_call(circuit: &str, outcome: &str) {
    counter!(
        "search_odm_circuit_breaker_calls_total",
        "circuit" => circuit.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a high-level operation outcome
pub fn record_operation(operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        "search_odm_operations_total",
        "operation" => operation.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record high-level operation latency
pub fn record_operation_latency(operation: &str, duration: Duration) {
    histogram!(
        "search_odm_operation_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record number of hits returned by one search round-trip
pub fn record_search_hits(count: usize) {
    histogram!("search_odm_search_hits").record(count as f64);
}

/// Record bulk item outcomes
pub fn record_bulk_items(succeeded: usize, failed: usize) {
    counter!("search_odm_bulk_items_total", "status" => "success").increment(succeeded as u64);
    counter!("search_odm_bulk_items_total", "status" => "error").increment(failed as u64);
}

/// Record index lifecycle operations (create, delete, put_mapping, alias, template)
pub fn record_index_operation(operation: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "search_odm_index_operations_total",
        "operation" => operation.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a document that could not be converted to or from its entity
pub fn record_conversion_error(direction: &str) {
    counter!(
        "search_odm_conversion_errors_total",
        "direction" => direction.to_string()
    )
    .increment(1);
}

/// Set the number of scroll contexts this process currently holds open
pub fn set_open_scrolls(count: usize) {
    gauge!("search_odm_open_scrolls").set(count as f64);
}

/// Set number of entity types in the mapping context
pub fn set_registered_entities(count: usize) {
    gauge!("search_odm_registered_entities").set(count as f64);
}

/// A timing guard that records operation latency and outcome on drop.
///
/// Outcome defaults to error; call [`LatencyTimer::success`] once the
/// operation completed.
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
    success: bool,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
            success: false,
        }
    }

    pub fn success(&mut self) {
        self.success = true;
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_operation_latency(self.operation, self.start.elapsed());
        record_operation(self.operation, self.success);
    }
}

/// Convenience macro for timing operations
#[macro_export]
macro_rules! time_operation {
    ($op:expr) => {
        $crate::metrics::LatencyTimer::new($op)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    type Snapshot = Vec<(
        metrics_util::CompositeKey,
        Option<metrics::Unit>,
        Option<metrics::SharedString>,
        DebugValue,
    )>;

    fn counter_value(snapshot: Snapshot, name: &str) -> u64 {
        snapshot
            .into_iter()
            .filter(|(key, _, _, _)| key.key().name() == name)
            .map(|(_, _, _, value)| match value {
                DebugValue::Counter(n) => n,
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn test_status_class() {
        assert_eq!(status_class(201), "2xx");
        assert_eq!(status_class(404), "4xx");
        assert_eq!(status_class(503), "5xx");
        assert_eq!(status_class(42), "other");
    }

    #[test]
    fn test_request_metrics_recorded() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_request("GET", 200);
            record_request("PUT", 409);
            record_transport_error("POST");
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert_eq!(counter_value(snapshot, "search_odm_requests_total"), 2);
    }

    #[test]
    fn test_latency_timer_records_outcome() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            let mut timer = LatencyTimer::new("save");
            timer.success();
            drop(timer);
            let _failed = time_operation!("get");
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert_eq!(counter_value(snapshot, "search_odm_operations_total"), 2);
    }

    #[test]
    fn test_remaining_metrics_do_not_panic() {
        record_request_latency("GET", Duration::from_millis(3));
        record_circuit_breaker_call("endpoint:http://a:9200", "success");
        record_search_hits(10);
        record_bulk_items(9, 1);
        record_index_operation("create", true);
        record_conversion_error("read");
        set_open_scrolls(2);
        set_registered_entities(5);
    }
}
