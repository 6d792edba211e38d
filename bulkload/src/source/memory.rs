use std::collections::VecDeque;

use crate::error::{ErrorKind, LoadError};
use crate::load_error;
use crate::source::base::{RowSource, SourceResult};
use crate::types::Record;

/// Row source serving a fixed list of rows, for tests.
#[derive(Debug, Default)]
pub struct MemorySource {
    rows: VecDeque<Record>,
    trailing_error: Option<LoadError>,
}

impl MemorySource {
    /// Creates a source yielding `rows` in order; the first one is the header.
    pub fn new<R>(rows: Vec<R>) -> Self
    where
        R: Into<Record>,
    {
        Self {
            rows: rows.into_iter().map(Into::into).collect(),
            trailing_error: None,
        }
    }

    /// Reports a read error once every row was served.
    pub fn with_read_error(mut self, detail: &str) -> Self {
        self.trailing_error = Some(load_error!(
            ErrorKind::SourceReadError,
            "Row could not be read",
            detail
        ));
        self
    }
}

impl RowSource for MemorySource {
    fn next_record(&mut self) -> SourceResult {
        if let Some(record) = self.rows.pop_front() {
            return SourceResult::Record(record);
        }

        match self.trailing_error.take() {
            Some(err) => SourceResult::ReadError(err),
            None => SourceResult::EndOfInput,
        }
    }
}
