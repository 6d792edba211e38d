use bulkload_config::shared::{StoreConnectionConfig, StoreConnectionConfigWithoutSecrets};
use sqlx::MySql;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use tracing::{debug, info};

use crate::error::{ErrorKind, LoadError, LoadResult};
use crate::load_error;
use crate::store::base::{Store, StoreConnection};

/// MySQL-compatible store backed by a [`MySqlPool`].
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates the pool and opens its first connection, failing fast on bad credentials.
    pub async fn connect(config: &StoreConnectionConfig) -> LoadResult<Self> {
        log_target(config);

        let pool = pool_options(config)
            .connect_with(config.with_db())
            .await
            .map_err(connection_failed)?;

        Ok(Self { pool })
    }
}

impl Store for MySqlStore {
    type Connection = MySqlStoreConnection;

    fn name() -> &'static str {
        "mysql"
    }

    async fn acquire(&self) -> LoadResult<Self::Connection> {
        let connection = self.pool.acquire().await.map_err(connection_failed)?;

        debug!(
            open = self.pool.size(),
            idle = self.pool.num_idle(),
            "acquired store connection"
        );

        Ok(MySqlStoreConnection { connection })
    }
}

/// A pooled connection held by one worker.
#[derive(Debug)]
pub struct MySqlStoreConnection {
    connection: PoolConnection<MySql>,
}

impl StoreConnection for MySqlStoreConnection {
    async fn execute(&mut self, statement: &str, params: &[String]) -> LoadResult<u64> {
        let mut query = sqlx::query(statement);
        for param in params {
            query = query.bind(param.as_str());
        }

        let result = query
            .execute(&mut *self.connection)
            .await
            .map_err(|err| {
                load_error!(
                    ErrorKind::StoreExecutionFailed,
                    "Batch insert failed",
                    err.to_string(),
                    source: err
                )
            })?;

        Ok(result.rows_affected())
    }

    async fn release(self) {
        // Dropping a pooled connection returns it to the pool.
        drop(self.connection);
    }
}

fn pool_options(config: &StoreConnectionConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
}

fn log_target(config: &StoreConnectionConfig) {
    let target: StoreConnectionConfigWithoutSecrets = config.clone().into();
    info!(
        host = %target.host,
        port = target.port,
        database = %target.name,
        username = %target.username,
        max_connections = target.max_connections,
        min_connections = target.min_connections,
        "connecting to store"
    );
}

fn connection_failed(err: sqlx::Error) -> LoadError {
    load_error!(
        ErrorKind::ConnectionAcquisitionFailed,
        "Store connection could not be acquired",
        err.to_string(),
        source: err
    )
}
