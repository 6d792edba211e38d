//! Error types and result definitions for bulk loading.
//!
//! [`LoadError`] carries a classification, a static description, optional dynamic detail, an
//! optional source error and the call site that created it. Errors coming from several workers
//! are aggregated into a single [`LoadError`].

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use bulkload_config::shared::ValidationError;

/// Result type for bulk loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type of the loader.
#[derive(Debug, Clone)]
pub struct LoadError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    Single(ErrorPayload),
    /// Failures of several workers, in the order they were joined.
    Many {
        errors: Vec<LoadError>,
        location: &'static Location<'static>,
    },
}

/// Categories of failures that can happen during a load.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Configuration
    ConfigError,

    // Row source
    SourceReadError,
    InvalidRecord,

    // Data store
    ConnectionAcquisitionFailed,
    StoreExecutionFailed,

    // Coordination
    QueueClosed,
    WorkerPanic,

    IoError,
    Unknown,

    // Raised by fault injection in tests.
    #[cfg(feature = "failpoints")]
    InjectedFault,
}

impl LoadError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For aggregated errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if there is none.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns every [`ErrorKind`] present in this error, flattening aggregates.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    /// Returns the static description, or `None` for aggregated errors.
    pub fn description(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(&payload.description),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the dynamic detail if available.
    ///
    /// For aggregated errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating error.
    ///
    /// Has no effect on aggregated errors, which forward their first error as the source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        LoadError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for LoadError {
    fn eq(&self, other: &LoadError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (ErrorRepr::Many { errors: a, .. }, ErrorRepr::Many { errors: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                write_detail(payload.detail.as_deref(), f)?;
                write_backtrace(payload.backtrace.as_ref(), f)
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    let rendered = error.to_string();
                    let mut lines = rendered.lines();
                    match lines.next() {
                        Some(first_line) => write!(f, "\n  {}. {}", index + 1, first_line)?,
                        None => write!(f, "\n  {}.", index + 1)?,
                    }

                    for line in lines {
                        write!(f, "\n     {line}")?;
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

fn write_backtrace(backtrace: &Backtrace, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let rendered = backtrace.to_string();
    if rendered.trim().is_empty() {
        return Ok(());
    }

    write!(f, "\n  Backtrace:")?;
    for line in rendered.lines() {
        write!(f, "\n    {line}")?;
    }

    Ok(())
}

fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Some(detail) = detail else {
        return Ok(());
    };

    if detail.trim().is_empty() {
        return write!(f, "\n  Detail: <empty>");
    }

    write!(f, "\n  Detail:")?;
    for line in detail.lines() {
        write!(f, "\n    {line}")?;
    }

    Ok(())
}

impl From<(ErrorKind, &'static str)> for LoadError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> LoadError {
        LoadError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

impl<D> From<(ErrorKind, &'static str, D)> for LoadError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> LoadError {
        LoadError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Aggregates errors; a single error is returned as is.
impl<E> From<Vec<E>> for LoadError
where
    E: Into<LoadError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> LoadError {
        let location = Location::caller();

        let mut errors: Vec<LoadError> = errors.into_iter().map(Into::into).collect();
        if errors.len() == 1
            && let Some(error) = errors.pop()
        {
            return error;
        }

        LoadError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

impl From<std::io::Error> for LoadError {
    #[track_caller]
    fn from(err: std::io::Error) -> LoadError {
        let detail = err.to_string();
        LoadError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Maps pool failures to [`ErrorKind::ConnectionAcquisitionFailed`] and everything else to
/// [`ErrorKind::StoreExecutionFailed`].
impl From<sqlx::Error> for LoadError {
    #[track_caller]
    fn from(err: sqlx::Error) -> LoadError {
        let (kind, description) = match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => (
                ErrorKind::ConnectionAcquisitionFailed,
                "Store connection could not be acquired",
            ),
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => (
                ErrorKind::ConnectionAcquisitionFailed,
                "Store connection failed",
            ),
            sqlx::Error::Database(_) => (
                ErrorKind::StoreExecutionFailed,
                "Store rejected the statement",
            ),
            _ => (
                ErrorKind::StoreExecutionFailed,
                "Store operation failed",
            ),
        };

        let detail = err.to_string();
        LoadError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<csv::Error> for LoadError {
    #[track_caller]
    fn from(err: csv::Error) -> LoadError {
        let (kind, description) = if err.is_io_error() {
            (ErrorKind::IoError, "CSV source I/O failed")
        } else {
            (ErrorKind::SourceReadError, "CSV record could not be read")
        };

        let detail = err.to_string();
        LoadError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<ValidationError> for LoadError {
    #[track_caller]
    fn from(err: ValidationError) -> LoadError {
        let detail = err.to_string();
        LoadError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Invalid configuration"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_error;

    #[test]
    fn single_error_renders_kind_description_and_detail() {
        let err = load_error!(
            ErrorKind::InvalidRecord,
            "Record does not match the header",
            "expected 2 fields, got 3"
        );

        let rendered = err.to_string();
        assert!(rendered.starts_with("[InvalidRecord] Record does not match the header @ "));
        assert!(rendered.contains("expected 2 fields, got 3"));
        assert_eq!(err.detail(), Some("expected 2 fields, got 3"));
    }

    #[test]
    fn aggregate_of_one_is_the_error_itself() {
        let err: LoadError =
            vec![load_error!(ErrorKind::WorkerPanic, "Batch worker panicked")].into();

        assert_eq!(err.kind(), ErrorKind::WorkerPanic);
        assert_eq!(err.description(), Some("Batch worker panicked"));
    }

    #[test]
    fn aggregate_collects_every_kind() {
        let err: LoadError = vec![
            load_error!(ErrorKind::StoreExecutionFailed, "Store rejected the statement"),
            load_error!(ErrorKind::WorkerPanic, "Batch worker panicked"),
        ]
        .into();

        assert_eq!(err.kind(), ErrorKind::StoreExecutionFailed);
        assert_eq!(
            err.kinds(),
            vec![ErrorKind::StoreExecutionFailed, ErrorKind::WorkerPanic]
        );
        assert!(err.to_string().starts_with("[Many] 2 errors aggregated"));
    }

    #[test]
    fn io_error_keeps_its_source() {
        let err: LoadError = std::io::Error::other("disk on fire").into();

        assert_eq!(err.kind(), ErrorKind::IoError);
        assert!(error::Error::source(&err).is_some());
    }

    #[test]
    fn pool_timeout_is_an_acquisition_failure() {
        let err: LoadError = sqlx::Error::PoolTimedOut.into();

        assert_eq!(err.kind(), ErrorKind::ConnectionAcquisitionFailed);
    }
}
