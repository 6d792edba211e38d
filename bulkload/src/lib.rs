//! Bulk loading of CSV rows into a relational store.
//!
//! A [`pipeline::Loader`] reads the header from a [`source::RowSource`], starts a fixed pool
//! of batch workers through the [`dispatcher::Dispatcher`], streams the remaining rows into a
//! bounded job queue and, once the source is exhausted, lets the
//! [`coordinator::ShutdownCoordinator`] stop every worker after its last flush. Each worker
//! writes multi-row inserts bounded by a maximum size and a maximum fill window.

pub mod concurrency;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
#[cfg(feature = "failpoints")]
pub mod failpoints;
mod macros;
pub mod metrics;
pub mod pipeline;
pub mod query;
pub mod source;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod workers;
