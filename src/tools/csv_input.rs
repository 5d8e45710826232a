//! Header-addressed CSV input shared by the data tools.

use crate::error::{AppError, ConfigError};
use std::path::Path;

#[derive(Clone, Debug, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Records the reader rejected (bad UTF-8, broken quoting). Logged and skipped.
    pub malformed: usize,
}

impl CsvTable {
    pub fn read(path: &Path) -> Result<Self, AppError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut table = CsvTable {
            headers,
            ..CsvTable::default()
        };
        for (line, record) in reader.records().enumerate() {
            match record {
                Ok(record) => table.rows.push(record.iter().map(String::from).collect()),
                Err(e) => {
                    tracing::warn!(row = line + 1, error = %e, "skipping malformed CSV row");
                    table.malformed += 1;
                }
            }
        }
        Ok(table)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of `name`, or a fatal error naming the missing column.
    pub fn require(&self, name: &str) -> Result<usize, ConfigError> {
        self.position(name)
            .ok_or_else(|| ConfigError::MissingColumn(name.to_string()))
    }

    /// Cell `column` of `row`, "" when the row is short.
    pub fn cell<'a>(&self, row: &'a [String], column: usize) -> &'a str {
        row.get(column).map(String::as_str).unwrap_or("")
    }
}
