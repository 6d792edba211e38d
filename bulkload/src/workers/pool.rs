use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bulkload_config::shared::FlushErrorPolicy;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::concurrency::shutdown::{ShutdownRx, ShutdownTx, create_shutdown_channel};
use crate::error::{ErrorKind, LoadError, LoadResult};
use crate::load_error;
use crate::workers::batch_worker::{WorkerId, WorkerStats};

/// Applies the [`FlushErrorPolicy`] as soon as a worker fails.
#[derive(Debug, Clone)]
struct WorkerSupervisor {
    policy: FlushErrorPolicy,
    shutdown_tx: ShutdownTx,
    active_workers: Arc<AtomicUsize>,
}

impl WorkerSupervisor {
    fn report(&self, worker_id: WorkerId, err: &LoadError) {
        match self.policy {
            FlushErrorPolicy::Abort => {
                error!(worker_id, error = %err, "batch worker failed, aborting the load");
                self.abort();
            }
            FlushErrorPolicy::Continue => {
                // The failing worker is still counted until its guard drops.
                let remaining = self.active_workers.load(Ordering::SeqCst).saturating_sub(1);
                warn!(
                    worker_id,
                    error = %err,
                    remaining,
                    "batch worker failed, continuing with reduced capacity"
                );
            }
        }
    }

    fn abort(&self) {
        self.shutdown_tx.shutdown();
    }
}

/// Decrements the active worker count when a worker task ends, panics included.
struct ActiveWorkerGuard {
    worker_id: WorkerId,
    supervisor: WorkerSupervisor,
}

impl Drop for ActiveWorkerGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let err = load_error!(ErrorKind::WorkerPanic, "Batch worker panicked");
            self.supervisor.report(self.worker_id, &err);
        }

        self.supervisor
            .active_workers
            .fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owns every batch worker task of a run.
///
/// Worker failures are handled by the pool policy while the workers run: with
/// [`FlushErrorPolicy::Abort`] the abort signal is broadcast immediately. Errors are also
/// collected and returned by [`BatchWorkerPool::wait_all`].
#[derive(Debug)]
pub struct BatchWorkerPool {
    join_set: JoinSet<(WorkerId, LoadResult<WorkerStats>)>,
    supervisor: WorkerSupervisor,
    size: usize,
}

impl BatchWorkerPool {
    pub fn new(policy: FlushErrorPolicy) -> Self {
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            join_set: JoinSet::new(),
            supervisor: WorkerSupervisor {
                policy,
                shutdown_tx,
                active_workers: Arc::new(AtomicUsize::new(0)),
            },
            size: 0,
        }
    }

    /// Spawns a worker task and counts it as active until it ends.
    pub fn spawn<F>(&mut self, worker_id: WorkerId, future: F)
    where
        F: Future<Output = LoadResult<WorkerStats>> + Send + 'static,
    {
        self.supervisor
            .active_workers
            .fetch_add(1, Ordering::SeqCst);
        self.size += 1;

        let supervisor = self.supervisor.clone();
        self.join_set.spawn(async move {
            let _guard = ActiveWorkerGuard {
                worker_id,
                supervisor: supervisor.clone(),
            };

            let result = future.await;
            if let Err(err) = &result {
                supervisor.report(worker_id, err);
            }

            (worker_id, result)
        });

        debug!(worker_id, "spawned batch worker");
    }

    /// Returns a receiver of the abort signal for a new worker.
    pub fn subscribe(&self) -> ShutdownRx {
        self.supervisor.shutdown_tx.subscribe()
    }

    /// Returns a handle able to send the abort signal from outside the pool.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.supervisor.shutdown_tx.clone()
    }

    /// Tells every worker to stop before its next cycle or write.
    pub fn abort(&self) {
        info!("aborting batch workers");
        self.supervisor.abort();
    }

    /// Number of workers spawned in this pool.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of workers whose task has not ended yet.
    pub fn active_workers(&self) -> usize {
        self.supervisor.active_workers.load(Ordering::SeqCst)
    }

    /// Waits for every worker to end.
    ///
    /// Returns the summed statistics, or every worker error aggregated into one.
    pub async fn wait_all(mut self) -> LoadResult<WorkerStats> {
        let mut stats = WorkerStats::default();
        let mut errors = Vec::new();

        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok((_, Ok(worker_stats))) => stats += worker_stats,
                Ok((worker_id, Err(err))) => {
                    debug!(worker_id, "collected batch worker error");
                    errors.push(err);
                }
                Err(join_err) => {
                    if join_err.is_cancelled() {
                        debug!("batch worker task was cancelled");
                    } else {
                        errors.push(load_error!(
                            ErrorKind::WorkerPanic,
                            "Batch worker panicked",
                            join_err
                        ));
                    }
                }
            }
        }

        debug_assert_eq!(self.active_workers(), 0);

        if errors.is_empty() {
            Ok(stats)
        } else {
            Err(errors.into())
        }
    }
}
