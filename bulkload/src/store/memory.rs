use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, LoadResult};
use crate::store::base::{Store, StoreConnection};

/// A statement executed against a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedStatement {
    pub statement: String,
    pub params: Vec<String>,
}

#[derive(Debug, Default)]
struct Inner {
    executed: Vec<ExecutedStatement>,
    executions: usize,
    acquired: usize,
    released: usize,
    fail_on_execution: Option<usize>,
    fail_acquire: bool,
    execution_delay: Option<Duration>,
}

/// In-memory store recording every statement, for tests.
///
/// Can be told to fail a given execution or every connection acquisition.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `execution`-th call to [`StoreConnection::execute`] fail, counting from 1
    /// across all connections.
    pub fn failing_on_execution(execution: usize) -> Self {
        Self::with_inner(Inner {
            fail_on_execution: Some(execution),
            ..Inner::default()
        })
    }

    /// Makes every connection acquisition fail.
    pub fn failing_acquire() -> Self {
        Self::with_inner(Inner {
            fail_acquire: true,
            ..Inner::default()
        })
    }

    fn with_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Delays every execution by `delay`, simulating a slow store.
    pub async fn set_execution_delay(&self, delay: Duration) {
        self.inner.lock().await.execution_delay = Some(delay);
    }

    /// Returns every successfully executed statement, in execution order.
    pub async fn executed(&self) -> Vec<ExecutedStatement> {
        self.inner.lock().await.executed.clone()
    }

    /// Returns the parameters of all executed statements, flattened.
    pub async fn params(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner
            .executed
            .iter()
            .flat_map(|executed| executed.params.iter().cloned())
            .collect()
    }

    /// Returns the number of execution attempts, failed ones included.
    pub async fn executions(&self) -> usize {
        self.inner.lock().await.executions
    }

    pub async fn acquired(&self) -> usize {
        self.inner.lock().await.acquired
    }

    pub async fn released(&self) -> usize {
        self.inner.lock().await.released
    }
}

impl Store for MemoryStore {
    type Connection = MemoryStoreConnection;

    fn name() -> &'static str {
        "memory"
    }

    async fn acquire(&self) -> LoadResult<Self::Connection> {
        let mut inner = self.inner.lock().await;
        if inner.fail_acquire {
            bail!(
                ErrorKind::ConnectionAcquisitionFailed,
                "Store connection could not be acquired",
                "memory store configured to refuse connections"
            );
        }

        inner.acquired += 1;

        Ok(MemoryStoreConnection {
            inner: self.inner.clone(),
        })
    }
}

#[derive(Debug)]
pub struct MemoryStoreConnection {
    inner: Arc<Mutex<Inner>>,
}

impl StoreConnection for MemoryStoreConnection {
    async fn execute(&mut self, statement: &str, params: &[String]) -> LoadResult<u64> {
        let delay = {
            let mut inner = self.inner.lock().await;
            inner.executions += 1;

            if inner.fail_on_execution == Some(inner.executions) {
                bail!(
                    ErrorKind::StoreExecutionFailed,
                    "Batch insert failed",
                    format!("memory store configured to fail execution {}", inner.executions)
                );
            }

            inner.execution_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let rows = statement.matches("(?").count() as u64;
        info!(rows, "writing batch to memory store");

        let mut inner = self.inner.lock().await;
        inner.executed.push(ExecutedStatement {
            statement: statement.to_string(),
            params: params.to_vec(),
        });

        Ok(rows)
    }

    async fn release(self) {
        self.inner.lock().await.released += 1;
    }
}
