//! Shared configuration types for bulk loading runs.

mod base;
mod batch;
mod loader;
mod pipeline;
mod source;
mod store;

pub use base::ValidationError;
pub use batch::BatchConfig;
pub use loader::{LoaderConfig, LoaderConfigWithoutSecrets};
pub use pipeline::{FlushErrorPolicy, MalformedRowPolicy, PipelineConfig};
pub use source::SourceConfig;
pub use store::{StoreConnectionConfig, StoreConnectionConfigWithoutSecrets};
