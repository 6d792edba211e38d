use serde::{Deserialize, Serialize};

use crate::shared::{ValidationError, batch::BatchConfig};

/// What the worker pool does when a worker fails to flush or to acquire its connection.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FlushErrorPolicy {
    /// Signal every worker to stop; records still held unflushed are discarded.
    #[default]
    Abort,
    /// Let the remaining workers keep running with reduced capacity.
    Continue,
}

/// What the loader does with a record whose field count differs from the header.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MalformedRowPolicy {
    /// Log a warning, count the record as skipped and move on.
    #[default]
    Skip,
    /// Fail the whole run.
    Reject,
}

/// Concurrency and batching settings of a loading run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Number of workers, each holding one store connection for its whole life.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Capacity of the job queue between the row source and the workers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Batch processing configuration.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Stop reading the source after this many data rows.
    ///
    /// Every row read counts, including malformed rows that are skipped.
    #[serde(default)]
    pub max_rows: Option<u64>,
    #[serde(default)]
    pub on_flush_error: FlushErrorPolicy,
    #[serde(default)]
    pub malformed_rows: MalformedRowPolicy,
}

impl PipelineConfig {
    /// Default number of workers.
    pub const DEFAULT_WORKERS: usize = 10;

    /// Default job queue capacity.
    pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

    /// Validates pipeline configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.workers == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "pipeline.workers".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if self.queue_capacity == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "pipeline.queue_capacity".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        self.batch.validate()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            batch: BatchConfig::default(),
            max_rows: None,
            on_flush_error: FlushErrorPolicy::default(),
            malformed_rows: MalformedRowPolicy::default(),
        }
    }
}

fn default_workers() -> usize {
    PipelineConfig::DEFAULT_WORKERS
}

fn default_queue_capacity() -> usize {
    PipelineConfig::DEFAULT_QUEUE_CAPACITY
}
