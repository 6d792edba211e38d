use std::path::PathBuf;

use bulkload_config::load_config;
use bulkload_config::shared::LoaderConfig;

use crate::error::{CliError, CliResult};

/// Loads the loader configuration, applies the command line overrides and validates it.
pub fn load_loader_config(
    source: Option<PathBuf>,
    max_rows: Option<u64>,
) -> CliResult<LoaderConfig> {
    let mut config = load_config::<LoaderConfig>().map_err(CliError::config)?;

    if let Some(source) = source {
        config.source.path = source;
    }
    if max_rows.is_some() {
        config.pipeline.max_rows = max_rows;
    }

    config.validate().map_err(CliError::config)?;

    Ok(config)
}
