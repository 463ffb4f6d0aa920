//! Metric definitions for the collector.
//!
//! This module defines all metric names used throughout the collector.
//! Metrics are recorded through the `metrics` facade and exported to
//! Prometheus via `metrics-exporter-prometheus`, whose HTTP listener is
//! installed in the binary at startup.

use metrics::{counter, describe_counter, describe_gauge, gauge};

use crate::ports::MetricSink;

/// Total number of transactions processed.
pub const TRANSACTIONS_TOTAL: &str = "gno_transactions_total";
/// Total number of successful transactions.
pub const TRANSACTIONS_SUCCESS_TOTAL: &str = "gno_transactions_success_total";
/// Total number of failed transactions.
pub const TRANSACTIONS_FAILED_TOTAL: &str = "gno_transactions_failed_total";
/// Total number of blocks processed.
pub const BLOCKS_PROCESSED_TOTAL: &str = "gno_blocks_processed_total";
/// Latest processed block height.
pub const LATEST_PROCESSED_HEIGHT: &str = "gno_latest_processed_height";
/// Transactions by sender address.
pub const SENDER_ACTIVITY_TOTAL: &str = "gno_sender_activity_total";
/// Calls to packages/realms.
pub const PACKAGE_ACTIVITY_TOTAL: &str = "gno_package_activity_total";

/// Label key for sender-partitioned counters.
pub const LABEL_ADDRESS: &str = "address";
/// Label key for package-partitioned counters.
pub const LABEL_PACKAGE_PATH: &str = "package_path";

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        TRANSACTIONS_TOTAL,
        "Total number of transactions processed"
    );
    describe_counter!(
        SENDER_ACTIVITY_TOTAL,
        "Number of transactions by sender address"
    );
    describe_counter!(
        PACKAGE_ACTIVITY_TOTAL,
        "Number of calls to packages/realms"
    );
    describe_counter!(BLOCKS_PROCESSED_TOTAL, "Total number of blocks processed");
    describe_counter!(
        TRANSACTIONS_SUCCESS_TOTAL,
        "Total number of successful transactions"
    );
    describe_counter!(
        TRANSACTIONS_FAILED_TOTAL,
        "Total number of failed transactions"
    );
    describe_gauge!(
        LATEST_PROCESSED_HEIGHT,
        "Tracks the latest processed block height"
    );
}

/// Metric sink backed by the `metrics` facade.
///
/// Each call maps to one atomic recorder operation; the Prometheus
/// exporter serves the accumulated state for scraping.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusSink;

impl MetricSink for PrometheusSink {
    fn increment_counter(&self, name: &'static str) {
        counter!(name).increment(1);
    }

    fn increment_labeled(&self, name: &'static str, label: &'static str, value: &str) {
        counter!(name, label => value.to_string()).increment(1);
    }

    fn set_gauge(&self, name: &'static str, value: f64) {
        gauge!(name).set(value);
    }
}
