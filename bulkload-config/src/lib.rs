//! Configuration for bulk loading runs.
//!
//! Holds the serde types describing a run ([`shared::LoaderConfig`] and its parts), their
//! validation rules, the runtime [`Environment`] and the hierarchical [`load_config`] loader.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{LoadConfigError, load_config, load_config_from};
