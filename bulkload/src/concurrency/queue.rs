use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::error::{ErrorKind, LoadResult};
use crate::load_error;
use crate::types::Record;

/// Creates the bounded job queue.
///
/// Sends wait while `capacity` records are buffered. Every clone of the returned
/// [`JobReceiver`] competes for the same records.
pub fn create_job_queue(capacity: usize) -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity);

    (
        JobSender { tx },
        JobReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer side of the job queue.
#[derive(Debug)]
pub struct JobSender {
    tx: mpsc::Sender<Record>,
}

impl JobSender {
    /// Enqueues `record`, waiting while the queue is full.
    pub async fn send(&self, record: Record) -> LoadResult<()> {
        self.tx.send(record).await.map_err(|_| queue_closed())
    }

    /// Enqueues `record` from a synchronous context, blocking the thread while the queue is
    /// full.
    ///
    /// Must not be called from inside an async task.
    pub fn blocking_send(&self, record: Record) -> LoadResult<()> {
        self.tx.blocking_send(record).map_err(|_| queue_closed())
    }

    /// Returns `true` once no worker can receive anymore.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Closes the queue. Workers drain what is buffered and then see it closed.
    pub fn close(self) {
        drop(self);
    }
}

/// Consumer side of the job queue, shared by all workers.
#[derive(Debug, Clone)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Record>>>,
}

impl JobReceiver {
    /// Waits for the next record.
    ///
    /// Returns `None` once the queue is closed and empty. Cancel safe: a record is never lost
    /// when the returned future is dropped.
    pub async fn recv(&self) -> Option<Record> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

fn queue_closed() -> crate::error::LoadError {
    load_error!(
        ErrorKind::QueueClosed,
        "Job queue is closed",
        "no worker is left to receive records"
    )
}
