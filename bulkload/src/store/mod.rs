//! The data store seam and its implementations.

mod base;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod mysql;

pub use base::{Store, StoreConnection};
