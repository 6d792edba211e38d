//! Multi-row insert statements with `?` placeholders.
//!
//! [`InsertTemplate`] is derived once per run from the [`Header`]. Each worker owns one
//! [`InsertBatch`] that grows a statement and its parameter vector row by row, then is reset
//! after every flush.

use std::sync::Arc;

use crate::bail;
use crate::error::{ErrorKind, LoadResult};
use crate::types::{Header, Record};

const PLACEHOLDER: &str = "?";

/// The run-wide parts of an insert statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTemplate {
    columns: usize,
    /// `(?,?,...)` with one marker per column.
    placeholder_group: String,
    /// `insert into <table> (<columns>) values (<group>)`.
    prefix: String,
}

impl InsertTemplate {
    pub fn new(table: &str, header: &Header) -> LoadResult<Self> {
        let table = table.trim();
        if table.is_empty() {
            bail!(ErrorKind::ConfigError, "Target table name is empty");
        }

        if header.is_empty() {
            bail!(ErrorKind::InvalidRecord, "Header has no columns");
        }

        let placeholder_group = format!("({})", vec![PLACEHOLDER; header.len()].join(","));
        let prefix = format!(
            "insert into {table} ({}) values {placeholder_group}",
            header.columns().join(",")
        );

        Ok(Self {
            columns: header.len(),
            placeholder_group,
            prefix,
        })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn placeholder_group(&self) -> &str {
        &self.placeholder_group
    }

    /// Statement text for a single row.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// A batch of rows under construction, owned by a single worker.
#[derive(Debug)]
pub struct InsertBatch {
    template: Arc<InsertTemplate>,
    statement: String,
    params: Vec<String>,
    rows: usize,
}

impl InsertBatch {
    /// Creates an empty batch sized for `max_rows` rows.
    pub fn new(template: Arc<InsertTemplate>, max_rows: usize) -> Self {
        let params = Vec::with_capacity(template.columns() * max_rows);
        let statement = template.prefix().to_string();

        Self {
            template,
            statement,
            params,
            rows: 0,
        }
    }

    /// Appends `record` as the next row.
    ///
    /// Fails with [`ErrorKind::InvalidRecord`] if its field count differs from the header, in
    /// which case the batch is left unchanged.
    pub fn push(&mut self, record: Record) -> LoadResult<()> {
        if record.len() != self.template.columns() {
            bail!(
                ErrorKind::InvalidRecord,
                "Record does not match the header",
                format!(
                    "expected {} fields, got {}",
                    self.template.columns(),
                    record.len()
                )
            );
        }

        // The prefix already holds the group of the first row.
        if self.rows > 0 {
            self.statement.push_str(", ");
            self.statement.push_str(self.template.placeholder_group());
        }

        self.params.extend(record.into_values());
        self.rows += 1;

        Ok(())
    }

    /// Statement text covering every pushed row.
    ///
    /// Only meaningful when the batch is not empty.
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Field values of every pushed row, row-major.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Rebuilds the statement from the template prefix and drops every row.
    pub fn reset(&mut self) {
        self.statement.clear();
        self.statement.push_str(self.template.prefix());
        self.params.clear();
        self.rows = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(columns: &[&str]) -> Arc<InsertTemplate> {
        let header = Header::from(columns.to_vec());
        Arc::new(InsertTemplate::new("domain", &header).unwrap())
    }

    #[test]
    fn template_prefix_lists_columns_and_one_group() {
        let template = template(&["rank", "domain", "tld"]);

        assert_eq!(template.placeholder_group(), "(?,?,?)");
        assert_eq!(
            template.prefix(),
            "insert into domain (rank,domain,tld) values (?,?,?)"
        );
    }

    #[test]
    fn template_is_deterministic() {
        let header = Header::from(vec!["a", "b"]);

        assert_eq!(
            InsertTemplate::new("domain", &header).unwrap(),
            InsertTemplate::new("domain", &header).unwrap()
        );
    }

    #[test]
    fn empty_table_or_header_is_rejected() {
        let header = Header::from(vec!["a"]);
        let err = InsertTemplate::new(" ", &header).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);

        let err = InsertTemplate::new("domain", &Header::new(vec![])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);
    }

    #[test]
    fn two_rows_produce_two_groups_in_row_major_order() {
        let mut batch = InsertBatch::new(template(&["a", "b"]), 8);

        batch.push(Record::from(vec!["1", "2"])).unwrap();
        batch.push(Record::from(vec!["3", "4"])).unwrap();

        assert_eq!(
            batch.statement(),
            "insert into domain (a,b) values (?,?), (?,?)"
        );
        assert_eq!(batch.params(), ["1", "2", "3", "4"]);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn group_and_param_counts_follow_row_count() {
        let mut batch = InsertBatch::new(template(&["a", "b", "c"]), 8);

        for rows in 1..=8 {
            batch.push(Record::from(vec!["x", "y", "z"])).unwrap();

            assert_eq!(batch.params().len(), 3 * rows);
            assert_eq!(batch.statement().matches("(?,?,?)").count(), rows);
        }
    }

    #[test]
    fn mismatched_record_leaves_batch_untouched() {
        let mut batch = InsertBatch::new(template(&["a", "b"]), 8);
        batch.push(Record::from(vec!["1", "2"])).unwrap();

        let err = batch.push(Record::from(vec!["3"])).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidRecord);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.params(), ["1", "2"]);
    }

    #[test]
    fn reset_starts_again_from_the_prefix() {
        let template = template(&["a"]);
        let mut batch = InsertBatch::new(template.clone(), 8);
        batch.push(Record::from(vec!["1"])).unwrap();
        batch.push(Record::from(vec!["2"])).unwrap();

        batch.reset();

        assert!(batch.is_empty());
        assert!(batch.params().is_empty());
        assert_eq!(batch.statement(), template.prefix());
    }
}
