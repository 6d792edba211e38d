use std::fmt;
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bulkload_config::shared::BatchConfig;
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::concurrency::queue::JobReceiver;
use crate::concurrency::quit::QuitRx;
use crate::concurrency::shutdown::{ShutdownRx, is_shutdown_requested, wait_for_shutdown};
use crate::concurrency::timer::DeferredTimer;
use crate::error::LoadResult;
#[cfg(feature = "failpoints")]
use crate::failpoints::{BATCH_WORKER_BEFORE_FLUSH, bulkload_fail_point};
use crate::metrics::{
    BULKLOAD_BATCHES_FLUSHED_TOTAL, BULKLOAD_FLUSH_DURATION_SECONDS, BULKLOAD_ROWS_FLUSHED_TOTAL,
    CLOSE_REASON_LABEL, WORKER_ID_LABEL,
};
use crate::query::{InsertBatch, InsertTemplate};
use crate::store::StoreConnection;

pub type WorkerId = usize;

/// Why a batch cycle stopped accumulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleClose {
    /// The batch reached its maximum size.
    Full,
    /// The batch window elapsed.
    TimedOut,
    /// The job queue is closed and empty.
    QueueDrained,
}

impl CycleClose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleClose::Full => "full",
            CycleClose::TimedOut => "timed_out",
            CycleClose::QueueDrained => "queue_drained",
        }
    }
}

impl fmt::Display for CycleClose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a worker left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// It consumed a quit token.
    Quit,
    /// It observed the abort signal.
    Aborted,
}

/// What a worker wrote before exiting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub rows_flushed: u64,
    pub batches_flushed: u64,
    /// Rows the worker held when it observed the abort signal.
    pub rows_discarded: u64,
}

impl AddAssign for WorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.rows_flushed += other.rows_flushed;
        self.batches_flushed += other.batches_flushed;
        self.rows_discarded += other.rows_discarded;
    }
}

/// A worker pulling records from the job queue and writing them in multi-row inserts.
///
/// Each cycle accumulates records until the batch is full, the batch window elapses or the
/// queue is drained, then flushes the batch with one statement. Between cycles the worker
/// takes a quit token if one is available, and exits once it holds a token and has seen the
/// queue drained. It owns its store connection for its whole life.
#[derive(Debug)]
pub struct BatchWorker<C> {
    worker_id: WorkerId,
    template: Arc<InsertTemplate>,
    batch_config: BatchConfig,
    connection: C,
    job_rx: JobReceiver,
    quit_rx: QuitRx,
    shutdown_rx: ShutdownRx,
    stats: WorkerStats,
}

impl<C> BatchWorker<C>
where
    C: StoreConnection,
{
    pub fn new(
        worker_id: WorkerId,
        template: Arc<InsertTemplate>,
        batch_config: BatchConfig,
        connection: C,
        job_rx: JobReceiver,
        quit_rx: QuitRx,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            worker_id,
            template,
            batch_config,
            connection,
            job_rx,
            quit_rx,
            shutdown_rx,
            stats: WorkerStats::default(),
        }
    }

    /// Runs the worker until it takes a quit token, observes the abort signal or fails.
    ///
    /// The connection is released on every path. A flush failure is returned as is and
    /// never retried.
    pub async fn run(mut self) -> LoadResult<WorkerStats> {
        info!(worker_id = self.worker_id, "starting batch worker");

        let result = self.run_cycles().await;

        self.connection.release().await;

        match result {
            Ok(exit) => {
                info!(
                    worker_id = self.worker_id,
                    ?exit,
                    rows_flushed = self.stats.rows_flushed,
                    batches_flushed = self.stats.batches_flushed,
                    "batch worker exited"
                );

                Ok(self.stats)
            }
            Err(err) => {
                warn!(worker_id = self.worker_id, error = %err, "batch worker failed");

                Err(err)
            }
        }
    }

    async fn run_cycles(&mut self) -> LoadResult<WorkerExit> {
        let mut batch = InsertBatch::new(self.template.clone(), self.batch_config.max_size);
        let mut timer = DeferredTimer::new(Duration::from_millis(self.batch_config.max_fill_ms));
        let mut holds_quit_token = false;

        loop {
            if is_shutdown_requested(&self.shutdown_rx) {
                info!(worker_id = self.worker_id, "abort requested, stopping batch worker");
                return Ok(WorkerExit::Aborted);
            }

            batch.reset();
            timer.start();

            let reason = self.accumulate(&mut batch, &mut timer).await?;

            if !batch.is_empty() && !self.flush(&batch, reason).await? {
                return Ok(WorkerExit::Aborted);
            }

            if !holds_quit_token && self.quit_rx.try_take() {
                debug!(worker_id = self.worker_id, "took quit token");
                holds_quit_token = true;
            }

            // Records still buffered in a closed queue are drained before leaving.
            if reason != CycleClose::QueueDrained {
                continue;
            }

            if holds_quit_token {
                return Ok(WorkerExit::Quit);
            }

            debug!(worker_id = self.worker_id, "queue drained, waiting for quit token");

            return Ok(tokio::select! {
                biased;

                _ = self.quit_rx.take() => WorkerExit::Quit,
                _ = wait_for_shutdown(&mut self.shutdown_rx) => WorkerExit::Aborted,
            });
        }
    }

    async fn accumulate(
        &mut self,
        batch: &mut InsertBatch,
        timer: &mut DeferredTimer,
    ) -> LoadResult<CycleClose> {
        loop {
            tokio::select! {
                biased;

                record = self.job_rx.recv() => {
                    let Some(record) = record else {
                        return Ok(CycleClose::QueueDrained);
                    };

                    batch.push(record)?;

                    if batch.len() >= self.batch_config.max_size {
                        return Ok(CycleClose::Full);
                    }
                }

                _ = &mut *timer => {
                    return Ok(CycleClose::TimedOut);
                }
            }
        }
    }

    /// Writes `batch` with one statement.
    ///
    /// Returns `false` without writing if the abort signal arrived during accumulation.
    async fn flush(&mut self, batch: &InsertBatch, reason: CycleClose) -> LoadResult<bool> {
        if is_shutdown_requested(&self.shutdown_rx) {
            warn!(
                worker_id = self.worker_id,
                rows = batch.len(),
                "abort requested, discarding batch"
            );
            self.stats.rows_discarded += batch.len() as u64;

            return Ok(false);
        }

        #[cfg(feature = "failpoints")]
        bulkload_fail_point(BATCH_WORKER_BEFORE_FLUSH)?;

        debug!(worker_id = self.worker_id, statement = batch.statement(), "flushing batch");

        let started = Instant::now();
        self.connection
            .execute(batch.statement(), batch.params())
            .await?;
        let elapsed = started.elapsed();

        let rows = batch.len() as u64;
        self.stats.rows_flushed += rows;
        self.stats.batches_flushed += 1;

        let worker_id = self.worker_id.to_string();
        counter!(BULKLOAD_ROWS_FLUSHED_TOTAL, WORKER_ID_LABEL => worker_id.clone()).increment(rows);
        counter!(
            BULKLOAD_BATCHES_FLUSHED_TOTAL,
            WORKER_ID_LABEL => worker_id.clone(),
            CLOSE_REASON_LABEL => reason.as_str()
        )
        .increment(1);
        histogram!(BULKLOAD_FLUSH_DURATION_SECONDS, WORKER_ID_LABEL => worker_id)
            .record(elapsed.as_secs_f64());

        info!(
            worker_id = self.worker_id,
            rows,
            %reason,
            elapsed_ms = elapsed.as_millis() as u64,
            "flushed batch"
        );

        Ok(true)
    }
}
