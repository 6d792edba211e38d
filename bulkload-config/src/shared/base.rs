use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field holds a value outside of its accepted range.
    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
    /// The target table name is empty.
    #[error("`table` cannot be empty")]
    EmptyTableName,
    /// The CSV delimiter is not a single-byte character.
    #[error("`source.delimiter` must be a single ASCII character, got `{0}`")]
    InvalidDelimiter(char),
}
