//! Coordination primitives shared by the row producer, the workers and the coordinator.
//!
//! - [`queue`]: the bounded job queue feeding records to workers.
//! - [`quit`]: quit tokens, one per worker, issued once the source is exhausted.
//! - [`shutdown`]: the abort signal broadcast when the run must stop early.
//! - [`timer`]: the batch window timer.

pub mod queue;
pub mod quit;
pub mod shutdown;
pub mod timer;
