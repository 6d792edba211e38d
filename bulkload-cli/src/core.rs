use std::time::Instant;

use bulkload::pipeline::{LoadConfig, Loader};
use bulkload::source::csv::CsvSource;
use bulkload::store::mysql::MySqlStore;
use bulkload_config::shared::LoaderConfig;
use tracing::info;

use crate::error::CliResult;

/// Connects to the store, opens the CSV source and loads every row.
pub async fn run_load(config: LoaderConfig) -> CliResult<()> {
    let started_at = Instant::now();
    log_config(&config);

    let store = MySqlStore::connect(&config.store).await?;
    let source = CsvSource::from_config(&config.source)?;

    let loader = Loader::new(LoadConfig::from(&config), source, store);
    let stats = loader.run().await?;

    info!(
        rows_read = stats.rows_read,
        rows_skipped = stats.rows_skipped,
        rows_flushed = stats.rows_flushed,
        batches_flushed = stats.batches_flushed,
        "done in {} seconds",
        started_at.elapsed().as_secs()
    );

    Ok(())
}

fn log_config(config: &LoaderConfig) {
    let pipeline = &config.pipeline;
    info!(
        table = %config.table,
        source = %config.source.path.display(),
        workers = pipeline.workers,
        batch_max_size = pipeline.batch.max_size,
        batch_max_fill_ms = pipeline.batch.max_fill_ms,
        queue_capacity = pipeline.queue_capacity,
        max_rows = ?pipeline.max_rows,
        "starting bulk load"
    );
}
