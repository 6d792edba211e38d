use serde::{Deserialize, Serialize};

use crate::shared::{
    PipelineConfig, SourceConfig, StoreConnectionConfig, StoreConnectionConfigWithoutSecrets,
    ValidationError,
};

/// Complete configuration of one loading run.
///
/// This intentionally does not implement [`Serialize`]; use [`LoaderConfigWithoutSecrets`]
/// for logging.
#[derive(Clone, Debug, Deserialize)]
pub struct LoaderConfig {
    /// Target table of the inserts.
    #[serde(default = "default_table")]
    pub table: String,
    pub source: SourceConfig,
    pub store: StoreConnectionConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl LoaderConfig {
    pub const DEFAULT_TABLE: &'static str = "domain";

    /// Validates every section of the configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.table.trim().is_empty() {
            return Err(ValidationError::EmptyTableName);
        }

        self.source.validate()?;
        self.pipeline.validate()?;
        self.store.validate(self.pipeline.workers)?;

        Ok(())
    }
}

/// Same as [`LoaderConfig`] but without secrets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoaderConfigWithoutSecrets {
    pub table: String,
    pub source: SourceConfig,
    pub store: StoreConnectionConfigWithoutSecrets,
    pub pipeline: PipelineConfig,
}

impl From<LoaderConfig> for LoaderConfigWithoutSecrets {
    fn from(value: LoaderConfig) -> Self {
        LoaderConfigWithoutSecrets {
            table: value.table,
            source: value.source,
            store: value.store.into(),
            pipeline: value.pipeline,
        }
    }
}

fn default_table() -> String {
    LoaderConfig::DEFAULT_TABLE.to_string()
}
