use tracing::info;

use crate::concurrency::quit::QuitTx;
use crate::error::LoadResult;
use crate::workers::batch_worker::WorkerStats;
use crate::workers::pool::BatchWorkerPool;

/// Stops the workers of a run once the job queue is closed.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    quit_tx: QuitTx,
}

impl ShutdownCoordinator {
    pub fn new(quit_tx: QuitTx) -> Self {
        Self { quit_tx }
    }

    /// Issues one quit token per worker of `pool` and waits for all of them to exit.
    ///
    /// Must be called after the job queue was closed: a worker exits only once it holds a
    /// token and has seen the queue drained, so every buffered record and every batch still
    /// held by a worker is flushed before this returns.
    pub async fn shutdown(self, pool: BatchWorkerPool) -> LoadResult<WorkerStats> {
        let workers = pool.size();
        self.quit_tx.send_tokens(workers);

        info!(
            workers,
            active_workers = pool.active_workers(),
            "sent quit tokens, waiting for batch workers"
        );

        let stats = pool.wait_all().await?;

        info!(
            rows_flushed = stats.rows_flushed,
            batches_flushed = stats.batches_flushed,
            "all batch workers exited"
        );

        Ok(stats)
    }
}
