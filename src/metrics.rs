// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for search-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `search_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `operation`: show_tables, create_table, drop_table, insert, replace, delete,
//!   bulk_insert, exists, raw_query, search
//! - `status`: success, error
//! - `kind`: transport, schema, query, config

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a gateway call outcome
pub fn record_operation(operation: &str, status: &str) {
    counter!(
        "search_sync_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record gateway call latency
pub fn record_latency(operation: &str, duration: Duration) {
    histogram!(
        "search_sync_operation_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a failed call by error kind
pub fn record_error(operation: &str, kind: &str) {
    counter!(
        "search_sync_errors_total",
        "operation" => operation.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Documents sent in one bulk call
pub fn record_bulk_documents(table: &str, count: usize) {
    histogram!(
        "search_sync_bulk_documents",
        "table" => table.to_string()
    )
    .record(count as f64);
}

// ═══════════════════════════════════════════════════════════════════════════
// MIGRATION
// ═══════════════════════════════════════════════════════════════════════════

/// Record one table rebuild
pub fn record_rebuild(table: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        "search_sync_rebuilds_total",
        "table" => table.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a whole migration run duration
pub fn record_migration_duration(duration: Duration) {
    histogram!("search_sync_migration_seconds").record(duration.as_secs_f64());
}

/// Set the number of registered definitions
pub fn set_registered_definitions(count: usize) {
    gauge!("search_sync_registered_definitions").set(count as f64);
}

// ═══════════════════════════════════════════════════════════════════════════
// SYNC HOOKS
// ═══════════════════════════════════════════════════════════════════════════

/// Record a propagated record event (`outcome`: inserted, replaced, deleted, missing, error)
pub fn record_sync(event: &str, outcome: &str) {
    counter!(
        "search_sync_events_total",
        "event" => event.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

// ═══════════════════════════════════════════════════════════════════════════
// QUERY
// ═══════════════════════════════════════════════════════════════════════════

/// Record a query execution (`mode`: match, phrase, listing)
pub fn record_search_query(mode: &str, status: &str) {
    counter!(
        "search_sync_queries_total",
        "mode" => mode.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record search result count
pub fn record_search_results(count: usize) {
    histogram!("search_sync_search_results").record(count as f64);
}

/// Record a retried attempt
pub fn record_retry(operation: &str) {
    counter!(
        "search_sync_retries_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.operation, self.start.elapsed());
    }
}
