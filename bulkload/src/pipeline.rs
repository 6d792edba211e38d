//! The loader: wires the row source, the job queue, the workers and the coordinator.

use bulkload_config::shared::{LoaderConfig, MalformedRowPolicy, PipelineConfig};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::bail;
use crate::concurrency::queue::{JobSender, create_job_queue};
use crate::concurrency::quit::create_quit_channel;
use crate::concurrency::shutdown::{ShutdownRx, ShutdownTx, is_shutdown_requested};
use crate::coordinator::ShutdownCoordinator;
use crate::dispatcher::Dispatcher;
use crate::error::{ErrorKind, LoadError, LoadResult};
use crate::load_error;
use crate::metrics::BULKLOAD_ROWS_SKIPPED_TOTAL;
use crate::source::{RowSource, SourceResult};
use crate::store::Store;
use crate::types::Header;

/// Rows between two progress log lines.
const PROGRESS_LOG_INTERVAL: u64 = 1000;

/// Settings of a run that the loader itself consumes.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub table: String,
    pub pipeline: PipelineConfig,
}

impl From<&LoaderConfig> for LoadConfig {
    fn from(config: &LoaderConfig) -> Self {
        Self {
            table: config.table.clone(),
            pipeline: config.pipeline.clone(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Data rows read from the source, the header excluded.
    pub rows_read: u64,
    /// Rows dropped because their field count did not match the header.
    pub rows_skipped: u64,
    pub rows_flushed: u64,
    pub batches_flushed: u64,
}

#[derive(Debug, Default)]
struct ProducerStats {
    rows_read: u64,
    rows_skipped: u64,
    rows_sent: u64,
}

/// Loads every row of a source into a store.
#[derive(Debug)]
pub struct Loader<R, S> {
    config: LoadConfig,
    source: R,
    store: S,
}

impl<R, S> Loader<R, S>
where
    R: RowSource + Send + 'static,
    S: Store + Clone + Send + Sync + 'static,
{
    pub fn new(config: LoadConfig, source: R, store: S) -> Self {
        Self {
            config,
            source,
            store,
        }
    }

    /// Runs the load to completion.
    ///
    /// The first source row is the header. An empty source is a successful run that writes
    /// nothing. Source read errors end the input. Worker failures are handled according to
    /// the configured flush error policy and returned once every worker has exited.
    pub async fn run(self) -> LoadResult<LoadStats> {
        let Loader {
            config,
            mut source,
            store,
        } = self;

        let header = match source.next_record() {
            SourceResult::Record(record) => Header::new(record.into_values()),
            SourceResult::EndOfInput => {
                warn!("source is empty, nothing to load");
                return Ok(LoadStats::default());
            }
            SourceResult::ReadError(err) => {
                warn!(error = %err, "failed to read the header row, treating as end of input");
                return Ok(LoadStats::default());
            }
        };

        info!(columns = ?header.columns(), "read header");

        let dispatcher = Dispatcher::new(&header, &config.table, config.pipeline.clone())?;

        let (job_tx, job_rx) = create_job_queue(config.pipeline.queue_capacity);
        let (quit_tx, quit_rx) = create_quit_channel();
        let pool = dispatcher.start(store, job_rx, quit_rx);

        let producer = RowProducer {
            columns: header.len(),
            max_rows: config.pipeline.max_rows,
            malformed_rows: config.pipeline.malformed_rows,
            shutdown_rx: pool.subscribe(),
            shutdown_tx: pool.shutdown_tx(),
        };
        let produced = tokio::task::spawn_blocking(move || producer.run(&mut source, job_tx))
            .await
            .unwrap_or_else(|join_err| {
                Err(load_error!(
                    ErrorKind::WorkerPanic,
                    "Row producer panicked",
                    join_err
                ))
            });

        // Covers a panicking producer; a rejected row already sent the signal.
        if produced.is_err() {
            pool.abort();
        }

        let workers = ShutdownCoordinator::new(quit_tx).shutdown(pool).await;

        let (produced, workers) = match (produced, workers) {
            (Ok(produced), Ok(workers)) => (produced, workers),
            (produced, workers) => {
                let errors: Vec<LoadError> = [produced.err(), workers.err()]
                    .into_iter()
                    .flatten()
                    .collect();
                return Err(errors.into());
            }
        };

        debug!(rows_sent = produced.rows_sent, "row producer finished");

        let stats = LoadStats {
            rows_read: produced.rows_read,
            rows_skipped: produced.rows_skipped,
            rows_flushed: workers.rows_flushed,
            batches_flushed: workers.batches_flushed,
        };

        info!(
            rows_read = stats.rows_read,
            rows_skipped = stats.rows_skipped,
            rows_flushed = stats.rows_flushed,
            batches_flushed = stats.batches_flushed,
            "processed {} rows",
            stats.rows_read
        );

        Ok(stats)
    }
}

/// Forwards source rows to the job queue from the blocking thread pool.
struct RowProducer {
    columns: usize,
    max_rows: Option<u64>,
    malformed_rows: MalformedRowPolicy,
    shutdown_rx: ShutdownRx,
    shutdown_tx: ShutdownTx,
}

impl RowProducer {
    /// Sends rows until the input ends, the row ceiling is reached or the workers stop.
    ///
    /// The queue is closed when this returns.
    fn run<R>(self, source: &mut R, job_tx: JobSender) -> LoadResult<ProducerStats>
    where
        R: RowSource,
    {
        let mut stats = ProducerStats::default();

        loop {
            if self.max_rows.is_some_and(|max_rows| stats.rows_read >= max_rows) {
                info!(rows = stats.rows_read, "row limit reached, stopping the source");
                break;
            }

            if is_shutdown_requested(&self.shutdown_rx) {
                warn!("load aborted, stopping the source");
                break;
            }

            let record = match source.next_record() {
                SourceResult::Record(record) => record,
                SourceResult::EndOfInput => break,
                SourceResult::ReadError(err) => {
                    warn!(error = %err, "failed to read a row, treating as end of input");
                    break;
                }
            };

            stats.rows_read += 1;

            if record.len() != self.columns {
                match self.malformed_rows {
                    MalformedRowPolicy::Skip => {
                        warn!(
                            row = stats.rows_read,
                            expected = self.columns,
                            actual = record.len(),
                            "skipping row that does not match the header"
                        );
                        stats.rows_skipped += 1;
                        counter!(BULKLOAD_ROWS_SKIPPED_TOTAL).increment(1);
                        continue;
                    }
                    MalformedRowPolicy::Reject => {
                        // Workers must see the signal before the queue closes.
                        self.shutdown_tx.shutdown();
                        bail!(
                            ErrorKind::InvalidRecord,
                            "Record does not match the header",
                            format!(
                                "row {} has {} fields, expected {}",
                                stats.rows_read,
                                record.len(),
                                self.columns
                            )
                        );
                    }
                }
            }

            if job_tx.blocking_send(record).is_err() {
                warn!("job queue closed, no worker left to receive rows");
                break;
            }
            stats.rows_sent += 1;

            if stats.rows_read % PROGRESS_LOG_INTERVAL == 0 {
                info!(rows = stats.rows_read, "processed {} rows", stats.rows_read);
            }
        }

        job_tx.close();

        Ok(stats)
    }
}
