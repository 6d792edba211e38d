use bulkload_config::shared::{BatchConfig, PipelineConfig};

use crate::pipeline::{LoadConfig, Loader};
use crate::source::memory::MemorySource;
use crate::store::memory::MemoryStore;

/// Table used by test loads.
pub const TEST_TABLE: &str = "domain";

/// Builds a pipeline configuration with the given pool and batch sizes.
pub fn test_pipeline_config(workers: usize, max_size: usize, max_fill_ms: u64) -> PipelineConfig {
    PipelineConfig {
        workers,
        batch: BatchConfig {
            max_size,
            max_fill_ms,
        },
        ..PipelineConfig::default()
    }
}

/// Builds a loader writing `rows` (header first) into `store`.
pub fn create_memory_loader<T>(
    rows: Vec<Vec<T>>,
    pipeline: PipelineConfig,
    store: MemoryStore,
) -> Loader<MemorySource, MemoryStore>
where
    T: Into<String>,
{
    let config = LoadConfig {
        table: TEST_TABLE.to_string(),
        pipeline,
    };

    Loader::new(config, MemorySource::new(rows), store)
}
