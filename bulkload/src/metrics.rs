//! Metric names emitted by the loader. No recorder is installed by this crate.

/// Label for the worker id.
pub const WORKER_ID_LABEL: &str = "worker_id";

/// Label for the reason a batch cycle closed.
pub const CLOSE_REASON_LABEL: &str = "reason";

/// Counter for rows written to the store.
pub const BULKLOAD_ROWS_FLUSHED_TOTAL: &str = "bulkload_rows_flushed_total";

/// Counter for insert statements executed.
pub const BULKLOAD_BATCHES_FLUSHED_TOTAL: &str = "bulkload_batches_flushed_total";

/// Histogram of the time spent executing one insert statement.
pub const BULKLOAD_FLUSH_DURATION_SECONDS: &str = "bulkload_flush_duration_seconds";

/// Counter for source rows dropped because their shape did not match the header.
pub const BULKLOAD_ROWS_SKIPPED_TOTAL: &str = "bulkload_rows_skipped_total";
