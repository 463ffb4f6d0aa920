//! Port trait for the metric registry the collector folds events into.
//!
//! The collector never depends on a concrete metrics backend. The
//! production implementation lives in [`crate::metrics`]; tests use an
//! in-memory recorder.

/// Abstract counter/gauge registry.
///
/// All operations are total (they never fail) and safe to call while a
/// scrape is being served: each update is an independent atomic
/// operation, so reads never pause ingestion.
pub trait MetricSink: Send + Sync {
    /// Increment a named counter by one.
    fn increment_counter(&self, name: &'static str);

    /// Increment a label-partitioned counter by one.
    fn increment_labeled(&self, name: &'static str, label: &'static str, value: &str);

    /// Set a named gauge to an absolute value.
    fn set_gauge(&self, name: &'static str, value: f64);
}
