use fail::fail_point;

use crate::bail;
use crate::error::{ErrorKind, LoadResult};

pub const BATCH_WORKER_BEFORE_FLUSH: &str = "batch_worker.before_flush";

/// Evaluates the fail point `name`.
///
/// A `return` action makes it fail with [`ErrorKind::InjectedFault`], or with
/// [`ErrorKind::StoreExecutionFailed`] when the action parameter is `store`.
pub fn bulkload_fail_point(name: &str) -> LoadResult<()> {
    fail_point!(name, |parameter| {
        let error_kind = match parameter.as_deref() {
            Some("store") => ErrorKind::StoreExecutionFailed,
            _ => ErrorKind::InjectedFault,
        };

        bail!(
            error_kind,
            "An error occurred in a fail point",
            format!("The failpoint '{name}' returned an error")
        );
    });

    Ok(())
}
