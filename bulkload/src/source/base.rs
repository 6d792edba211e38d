use crate::error::LoadError;
use crate::types::Record;

/// Outcome of reading one row.
#[derive(Debug)]
pub enum SourceResult {
    Record(Record),
    EndOfInput,
    /// A row could not be read. The loader treats it as the end of the input.
    ReadError(LoadError),
}

/// An ordered, synchronous source of rows.
///
/// The first record is the header. Reads may block, so the loader drives sources from the
/// blocking thread pool.
pub trait RowSource {
    fn next_record(&mut self) -> SourceResult;
}

impl<T> RowSource for Box<T>
where
    T: RowSource + ?Sized,
{
    fn next_record(&mut self) -> SourceResult {
        (**self).next_record()
    }
}
