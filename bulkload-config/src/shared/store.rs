use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnectOptions;

use crate::shared::ValidationError;

/// Connection settings of the MySQL-compatible target store.
///
/// This intentionally does not implement [`Serialize`] to avoid leaking the password.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Database (schema) holding the target table.
    pub name: String,
    pub username: String,
    pub password: Option<SecretString>,
    /// Maximum number of open connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Number of idle connections the pool keeps around.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl StoreConnectionConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 100;

    pub const DEFAULT_MIN_CONNECTIONS: u32 = 4;

    /// Checks that the pool can hold one connection per worker.
    pub fn validate(&self, workers: usize) -> Result<(), ValidationError> {
        if self.max_connections == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "store.max_connections".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if (self.max_connections as usize) < workers {
            return Err(ValidationError::InvalidFieldValue {
                field: "store.max_connections".to_string(),
                constraint: format!("must be at least `pipeline.workers` ({workers})"),
            });
        }

        if self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidFieldValue {
                field: "store.min_connections".to_string(),
                constraint: "must not exceed `store.max_connections`".to_string(),
            });
        }

        Ok(())
    }

    pub fn without_db(&self) -> MySqlConnectOptions {
        let mut connect_options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username);

        if let Some(password) = &self.password {
            connect_options = connect_options.password(password.expose_secret());
        }

        connect_options
    }

    pub fn with_db(&self) -> MySqlConnectOptions {
        self.without_db().database(&self.name)
    }
}

/// Same as [`StoreConnectionConfig`] but without the password, safe to log and serialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConnectionConfigWithoutSecrets {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl From<StoreConnectionConfig> for StoreConnectionConfigWithoutSecrets {
    fn from(value: StoreConnectionConfig) -> Self {
        StoreConnectionConfigWithoutSecrets {
            host: value.host,
            port: value.port,
            name: value.name,
            username: value.username,
            max_connections: value.max_connections,
            min_connections: value.min_connections,
        }
    }
}

fn default_max_connections() -> u32 {
    StoreConnectionConfig::DEFAULT_MAX_CONNECTIONS
}

fn default_min_connections() -> u32 {
    StoreConnectionConfig::DEFAULT_MIN_CONNECTIONS
}
