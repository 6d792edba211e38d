use std::future::Future;

use crate::error::LoadResult;

/// A relational store the loader writes batches into.
///
/// Every worker acquires exactly one [`Store::Connection`] when it starts and keeps it until
/// it exits, so connections never need to be shared.
pub trait Store {
    type Connection: StoreConnection + Send + 'static;

    /// Returns the name of the store, used in logs.
    fn name() -> &'static str;

    /// Acquires a connection dedicated to one worker.
    ///
    /// Failures are reported as [`crate::error::ErrorKind::ConnectionAcquisitionFailed`].
    fn acquire(&self) -> impl Future<Output = LoadResult<Self::Connection>> + Send;
}

/// A connection owned by a single worker.
pub trait StoreConnection {
    /// Executes `statement`, binding `params` positionally to its `?` markers.
    ///
    /// Returns the number of affected rows. Failures are reported as
    /// [`crate::error::ErrorKind::StoreExecutionFailed`].
    fn execute(
        &mut self,
        statement: &str,
        params: &[String],
    ) -> impl Future<Output = LoadResult<u64>> + Send;

    /// Gives the connection back to the store.
    fn release(self) -> impl Future<Output = ()> + Send;
}
