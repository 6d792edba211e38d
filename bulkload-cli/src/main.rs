//! `bulkload` binary.
//!
//! Loads a CSV file into a MySQL table with a pool of batching workers. Configuration comes
//! from `configuration/` and `BULKLOAD_` environment variables; a few flags override it.

use std::path::PathBuf;
use std::process::ExitCode;

use bulkload_telemetry::tracing::init_tracing;
use clap::Parser;
use tracing::error;

use crate::config::load_loader_config;
use crate::core::run_load;
use crate::error::{CliError, CliResult};

mod config;
mod core;
mod error;

/// Bulk loads the rows of a CSV file into a relational table.
#[derive(Debug, Parser)]
#[command(name = "bulkload", version)]
struct Args {
    /// CSV file to load, overriding `source.path`.
    #[arg(long)]
    source: Option<PathBuf>,

    /// Maximum number of data rows to load, overriding `pipeline.max_rows`.
    #[arg(long)]
    max_rows: Option<u64>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

/// Loads the configuration, initializes tracing and runs the load on a multi-threaded
/// runtime.
fn run(args: Args) -> CliResult<()> {
    let config = load_loader_config(args.source, args.max_rows)?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(CliError::config)?;

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::from)
        .and_then(|runtime| runtime.block_on(run_load(config)));

    // Logged while the flusher is still alive.
    if let Err(err) = &result {
        error!("{err}");
    }

    result
}
