//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `classifier`: classifier name (e.g. "rekognition")
//! - `status`: outcome: "ok" or "error"

/// Label cache lookups answered from the persisted store.
pub const CACHE_HITS_TOTAL: &str = "huginn_label_cache_hits_total";

/// Label cache lookups that fell through to the classifier.
pub const CACHE_MISSES_TOTAL: &str = "huginn_label_cache_misses_total";

/// Calls made to the external recognition service.
///
/// Labels: `classifier`, `status` ("ok" | "error").
pub const CLASSIFICATIONS_TOTAL: &str = "huginn_classifications_total";

/// External recognition call duration in seconds.
///
/// Labels: `classifier`.
pub const CLASSIFICATION_DURATION_SECONDS: &str = "huginn_classification_duration_seconds";

/// Records staged for write-back with at least one tag.
pub const RECORDS_TAGGED_TOTAL: &str = "huginn_records_tagged_total";

/// Records left untouched because no label cleared the threshold.
pub const RECORDS_SKIPPED_TOTAL: &str = "huginn_records_skipped_total";

/// Bulk upsert calls issued, including the final flush.
pub const UPSERT_BATCHES_TOTAL: &str = "huginn_upsert_batches_total";
