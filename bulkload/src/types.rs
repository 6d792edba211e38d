//! Row-level data carried from the source to the store.

/// Ordered column names, read once from the first source row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<T> From<Vec<T>> for Header
where
    T: Into<String>,
{
    fn from(columns: Vec<T>) -> Self {
        Self::new(columns.into_iter().map(Into::into).collect())
    }
}

/// Field values of one source row, positionally aligned with the [`Header`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<String>,
}

impl Record {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T> From<Vec<T>> for Record
where
    T: Into<String>,
{
    fn from(values: Vec<T>) -> Self {
        Self::new(values.into_iter().map(Into::into).collect())
    }
}
