use std::sync::Arc;

use bulkload_config::shared::PipelineConfig;
use tracing::{error, info};

use crate::concurrency::queue::JobReceiver;
use crate::concurrency::quit::QuitRx;
use crate::concurrency::shutdown::wait_for_shutdown;
use crate::error::LoadResult;
use crate::query::InsertTemplate;
use crate::store::Store;
use crate::types::Header;
use crate::workers::batch_worker::{BatchWorker, WorkerStats};
use crate::workers::pool::BatchWorkerPool;

/// Starts the batch workers of a run.
///
/// The insert template is derived once from the header and shared by every worker.
#[derive(Debug)]
pub struct Dispatcher {
    template: Arc<InsertTemplate>,
    config: PipelineConfig,
}

impl Dispatcher {
    pub fn new(header: &Header, table: &str, config: PipelineConfig) -> LoadResult<Self> {
        config.validate()?;
        let template = InsertTemplate::new(table, header)?;

        Ok(Self {
            template: Arc::new(template),
            config,
        })
    }

    pub fn template(&self) -> &InsertTemplate {
        &self.template
    }

    /// Spawns exactly `workers` batch workers.
    ///
    /// Each worker acquires its own connection from `store` before its first cycle. Workers
    /// may start waiting on an empty queue right away.
    pub fn start<S>(&self, store: S, job_rx: JobReceiver, quit_rx: QuitRx) -> BatchWorkerPool
    where
        S: Store + Clone + Send + Sync + 'static,
    {
        let mut pool = BatchWorkerPool::new(self.config.on_flush_error);

        info!(
            workers = self.config.workers,
            batch_max_size = self.config.batch.max_size,
            batch_max_fill_ms = self.config.batch.max_fill_ms,
            store = S::name(),
            statement = self.template.prefix(),
            "starting batch workers"
        );

        for worker_id in 0..self.config.workers {
            let store = store.clone();
            let template = self.template.clone();
            let batch_config = self.config.batch.clone();
            let job_rx = job_rx.clone();
            let quit_rx = quit_rx.clone();
            let mut shutdown_rx = pool.subscribe();

            pool.spawn(worker_id, async move {
                let connection = tokio::select! {
                    biased;

                    _ = wait_for_shutdown(&mut shutdown_rx) => {
                        info!(worker_id, "abort requested before a store connection was acquired");
                        return Ok(WorkerStats::default());
                    }

                    connection = store.acquire() => connection.inspect_err(|err| {
                        error!(worker_id, error = %err, "failed to acquire a store connection");
                    })?,
                };

                BatchWorker::new(
                    worker_id,
                    template,
                    batch_config,
                    connection,
                    job_rx,
                    quit_rx,
                    shutdown_rx,
                )
                .run()
                .await
            });
        }

        pool
    }
}
