//! The row source seam and its implementations.

mod base;
pub mod csv;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use base::{RowSource, SourceResult};
