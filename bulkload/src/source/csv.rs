use std::fs::File;
use std::io;
use std::path::Path;

use bulkload_config::shared::SourceConfig;
use ::csv::{ReaderBuilder, StringRecord};

use crate::error::{ErrorKind, LoadResult};
use crate::load_error;
use crate::source::base::{RowSource, SourceResult};
use crate::types::Record;

/// Reads rows from CSV data.
///
/// Every row, the header included, is returned as a [`Record`]. Rows may have any number of
/// fields; matching them against the header is left to the loader.
#[derive(Debug)]
pub struct CsvSource<R> {
    reader: ::csv::Reader<R>,
    record: StringRecord,
}

impl CsvSource<File> {
    /// Opens the CSV file at `path`.
    pub fn open(path: impl AsRef<Path>, delimiter: u8) -> LoadResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            load_error!(
                ErrorKind::IoError,
                "CSV source could not be opened",
                path.display(),
                source: err
            )
        })?;

        Ok(Self::from_reader(file, delimiter))
    }

    pub fn from_config(config: &SourceConfig) -> LoadResult<Self> {
        Self::open(&config.path, config.delimiter_byte())
    }
}

impl<R> CsvSource<R>
where
    R: io::Read,
{
    pub fn from_reader(reader: R, delimiter: u8) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(reader);

        Self {
            reader,
            record: StringRecord::new(),
        }
    }
}

impl<R> RowSource for CsvSource<R>
where
    R: io::Read,
{
    fn next_record(&mut self) -> SourceResult {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => SourceResult::Record(Record::new(
                self.record.iter().map(str::to_string).collect(),
            )),
            Ok(false) => SourceResult::EndOfInput,
            Err(err) => SourceResult::ReadError(err.into()),
        }
    }
}
