//! Batch workers and the pool that owns them.

pub mod batch_worker;
pub mod pool;
