//! CSV import
//!
//! Uploads are parsed with a header row. Header names are matched to columns
//! by accessor key, then by column header text; unmatched headers are kept
//! verbatim. Each record is inserted on its own, so one bad line does not
//! stop the rest of the file.

use std::sync::Arc;

use serde_json::Value;
use tabula_core::{Row, RowStore};
use tabula_table::{TableColumn, TableConfig, validate_cell};
use thiserror::Error;

/// Errors during CSV import
#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("Please upload a CSV file")]
    UnsupportedFile(String),

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("CSV file has no header row")]
    MissingHeader,

    #[error("Import is not enabled for table '{0}'")]
    Disabled(String),
}

impl From<CsvImportError> for tabula_core::TabulaError {
    fn from(e: CsvImportError) -> Self {
        tabula_core::TabulaError::Validation(e.to_string())
    }
}

/// Outcome of one import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub inserted: usize,
    /// `(line, message)` for every record that was not inserted
    pub failed: Vec<(usize, String)>,
}

impl ImportReport {
    fn add_error(&mut self, line: usize, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(line, %message, "csv record rejected");
        self.failed.push((line, message));
    }
}

pub struct CsvImporter {
    store: Arc<dyn RowStore>,
    config: Arc<TableConfig>,
}

impl CsvImporter {
    pub fn new(store: Arc<dyn RowStore>, config: impl Into<Arc<TableConfig>>) -> Self {
        Self {
            store,
            config: config.into(),
        }
    }

    /// Parse `content` and insert every record into the table.
    ///
    /// Only `.csv` file names are accepted. Record-level problems (field
    /// count, invalid numbers, backend rejections) land in the report.
    #[tracing::instrument(skip(self, content), fields(table = %self.config.id))]
    pub async fn import(
        &self,
        file_name: &str,
        content: &str,
    ) -> Result<ImportReport, CsvImportError> {
        if !file_name.to_ascii_lowercase().ends_with(".csv") {
            return Err(CsvImportError::UnsupportedFile(file_name.to_string()));
        }
        if let Some(import) = &self.config.import
            && !import.enabled
        {
            return Err(CsvImportError::Disabled(self.config.id.clone()));
        }

        let mut records = parse_csv(content)?.into_iter();
        let (_, headers) = records.next().ok_or(CsvImportError::MissingHeader)?;
        let columns: Vec<(String, Option<&TableColumn>)> =
            headers.iter().map(|h| self.resolve_header(h)).collect();

        let mut report = ImportReport::default();
        let table = self.config.table_name();

        for (line, values) in records {
            if values.len() != columns.len() {
                report.add_error(
                    line,
                    format!("expected {} fields, found {}", columns.len(), values.len()),
                );
                continue;
            }

            let row = match build_row(&columns, values) {
                Ok(row) => row,
                Err(message) => {
                    report.add_error(line, message);
                    continue;
                }
            };

            match self.store.insert(table, row).await {
                Ok(_) => report.inserted += 1,
                Err(e) => report.add_error(line, e.user_message()),
            }
        }

        tracing::info!(
            inserted = report.inserted,
            failed = report.failed.len(),
            "csv import finished"
        );
        Ok(report)
    }

    fn resolve_header(&self, header: &str) -> (String, Option<&TableColumn>) {
        let column = self.config.column(header).or_else(|| {
            self.config
                .columns
                .iter()
                .find(|c| !c.header.is_empty() && c.header.eq_ignore_ascii_case(header))
        });
        match column {
            Some(column) => (column.accessor_key.clone(), Some(column)),
            None => (header.to_string(), None),
        }
    }
}

fn build_row(
    columns: &[(String, Option<&TableColumn>)],
    values: Vec<String>,
) -> Result<Row, String> {
    let mut row = Row::new();
    for ((key, column), raw) in columns.iter().zip(values) {
        let value = match column {
            Some(column) => validate_cell(column, Value::String(raw)).map_err(|e| e.to_string())?,
            None if key == "id" || key == "_id" => id_value(raw),
            None => Value::String(raw),
        };
        if value.is_null() || value.as_str().is_some_and(str::is_empty) {
            continue;
        }
        if key.contains('.') {
            row.set_path(key, value);
        } else {
            row.insert(key.clone(), value);
        }
    }
    Ok(row)
}

fn id_value(raw: String) -> Value {
    match raw.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(raw),
    }
}

/// Split one line into trimmed fields, honouring double-quoted fields
pub fn parse_csv_line(line: &str, delimiter: char) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == delimiter {
            result.push(current.trim().to_string());
            current = String::new();
        } else {
            current.push(c);
        }
    }

    result.push(current.trim().to_string());
    result
}

/// Parse a whole document into `(line, fields)` records.
///
/// Quoted fields may span lines; `line` is the 1-based line a record starts
/// on. Blank lines are skipped.
pub fn parse_csv(content: &str) -> Result<Vec<(usize, Vec<String>)>, CsvImportError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut records = Vec::new();
    let mut pending = String::new();
    let mut start_line = 0;

    for (idx, line) in content.lines().enumerate() {
        if pending.is_empty() {
            if line.trim().is_empty() {
                continue;
            }
            start_line = idx + 1;
        } else {
            pending.push('\n');
        }
        pending.push_str(line);

        if pending.matches('"').count() % 2 == 0 {
            records.push((start_line, parse_csv_line(&pending, ',')));
            pending.clear();
        }
    }

    if !pending.is_empty() {
        return Err(CsvImportError::ParseError {
            line: start_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    Ok(records)
}
