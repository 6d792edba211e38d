use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Location and format of the CSV input.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    /// Path of the CSV file. Its first row is the header.
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl SourceConfig {
    pub const DEFAULT_DELIMITER: char = ',';

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.delimiter.is_ascii() {
            return Err(ValidationError::InvalidDelimiter(self.delimiter));
        }

        Ok(())
    }

    /// Returns the delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> u8 {
        // Validated to be ASCII, so the first UTF-8 byte is the whole character.
        let mut buf = [0u8; 4];
        self.delimiter.encode_utf8(&mut buf).as_bytes()[0]
    }
}

fn default_delimiter() -> char {
    SourceConfig::DEFAULT_DELIMITER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let config = SourceConfig {
            path: PathBuf::from("rows.csv"),
            delimiter: '§',
        };

        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidDelimiter('§'))
        ));
    }

    #[test]
    fn delimiter_byte_matches_character() {
        let config = SourceConfig {
            path: PathBuf::from("rows.tsv"),
            delimiter: '\t',
        };

        assert_eq!(config.delimiter_byte(), b'\t');
    }
}
