//! Table export
//!
//! CSV is encoded here. Excel and PDF are produced by external encoders
//! registered on the [`Exporter`]; without one those formats are refused.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tabula_core::{Row, RowStore, SelectQuery, TabulaError};
use tabula_table::TableConfig;
use thiserror::Error;

/// Errors during export
#[derive(Debug, Error)]
pub enum CsvExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Export is not enabled for table '{0}'")]
    Disabled(String),

    #[error("Export format not supported: {0}")]
    NotSupported(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl From<TabulaError> for CsvExportError {
    fn from(e: TabulaError) -> Self {
        CsvExportError::QueryError(e.user_message())
    }
}

impl From<CsvExportError> for TabulaError {
    fn from(e: CsvExportError) -> Self {
        match e {
            CsvExportError::IoError(io) => TabulaError::Io(io),
            CsvExportError::QueryError(message) => TabulaError::Backend(message),
            CsvExportError::Disabled(_) => TabulaError::Validation(e.to_string()),
            CsvExportError::NotSupported(_) => TabulaError::NotSupported(e.to_string()),
            CsvExportError::EncodingError(_) => TabulaError::Backend(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Excel,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = CsvExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(CsvExportError::NotSupported(other.to_string())),
        }
    }
}

/// Encoded export ready to be sent as an attachment
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Turns selected fields of a set of rows into a file body
pub trait ExportEncoder: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn encode(&self, fields: &[String], rows: &[Row]) -> Result<Vec<u8>, CsvExportError>;
}

/// RFC 4180 CSV with a header row and CRLF record separators
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvEncoder;

impl CsvEncoder {
    pub fn write<W: Write>(
        &self,
        fields: &[String],
        rows: &[Row],
        writer: &mut W,
    ) -> Result<usize, CsvExportError> {
        let header = fields
            .iter()
            .map(|f| quote_field(f))
            .collect::<Vec<_>>()
            .join(",");
        writer.write_all(header.as_bytes())?;
        writer.write_all(b"\r\n")?;

        for (row_idx, row) in rows.iter().enumerate() {
            let line = fields
                .iter()
                .map(|field| quote_field(&cell_text(row.get_path(field))))
                .collect::<Vec<_>>()
                .join(",");
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\r\n")?;

            if (row_idx + 1) % 1000 == 0 {
                tracing::debug!(rows_exported = row_idx + 1, total_rows = rows.len(), "csv export progress");
            }
        }

        writer.flush()?;
        Ok(rows.len())
    }
}

impl ExportEncoder for CsvEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn encode(&self, fields: &[String], rows: &[Row]) -> Result<Vec<u8>, CsvExportError> {
        let mut buffer = Vec::new();
        self.write(fields, rows, &mut buffer)?;
        Ok(buffer)
    }
}

/// Quote a field when it holds a separator, a quote or a line break
pub fn quote_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Fields written for `config`: `export.fields`, else every column
pub fn export_fields(config: &TableConfig) -> Vec<String> {
    match &config.export {
        Some(export) if !export.fields.is_empty() => export.fields.clone(),
        _ => config
            .columns
            .iter()
            .map(|c| c.accessor_key.clone())
            .collect(),
    }
}

/// `export.filename`, else the lowercased endpoint, with the format's extension
pub fn export_filename(config: &TableConfig, format: ExportFormat) -> String {
    let extension = format.extension();
    let base = config
        .export
        .as_ref()
        .and_then(|e| e.filename.as_deref())
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| config.table_name().to_lowercase());

    if base
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(extension))
    {
        base
    } else {
        format!("{}.{}", base, extension)
    }
}

/// Format registry; CSV is always present
#[derive(Clone)]
pub struct Exporter {
    encoders: HashMap<ExportFormat, Arc<dyn ExportEncoder>>,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter {
    pub fn new() -> Self {
        let mut encoders: HashMap<ExportFormat, Arc<dyn ExportEncoder>> = HashMap::new();
        encoders.insert(ExportFormat::Csv, Arc::new(CsvEncoder));
        Self { encoders }
    }

    /// Register (or replace) the encoder for its format
    pub fn with_encoder(mut self, encoder: Arc<dyn ExportEncoder>) -> Self {
        self.encoders.insert(encoder.format(), encoder);
        self
    }

    pub fn supports(&self, format: ExportFormat) -> bool {
        self.encoders.contains_key(&format)
    }

    /// Encode `rows` for `config` in `format`.
    ///
    /// Fails with `Disabled` when the table turns export off and with
    /// `NotSupported` when the format is not offered or has no encoder.
    pub fn export_rows(
        &self,
        config: &TableConfig,
        rows: &[Row],
        format: ExportFormat,
    ) -> Result<ExportFile, CsvExportError> {
        if let Some(export) = &config.export {
            if !export.enabled {
                return Err(CsvExportError::Disabled(config.id.clone()));
            }
            if !export.formats.is_empty()
                && !export
                    .formats
                    .iter()
                    .any(|f| f.parse::<ExportFormat>().is_ok_and(|f| f == format))
            {
                return Err(CsvExportError::NotSupported(format.to_string()));
            }
        }

        let encoder = self
            .encoders
            .get(&format)
            .ok_or_else(|| CsvExportError::NotSupported(format.to_string()))?;

        let fields = export_fields(config);
        let bytes = encoder.encode(&fields, rows)?;

        tracing::info!(
            table = %config.id,
            format = %format,
            rows = rows.len(),
            bytes = bytes.len(),
            "exported table"
        );

        Ok(ExportFile {
            filename: export_filename(config, format),
            content_type: format.content_type(),
            bytes,
        })
    }

    /// Read every row of the table, in id order, and export it
    #[tracing::instrument(skip(self, store, config), fields(table = %config.id))]
    pub async fn export_table(
        &self,
        store: &dyn RowStore,
        config: &TableConfig,
        format: ExportFormat,
    ) -> Result<ExportFile, CsvExportError> {
        if !self.supports(format) {
            return Err(CsvExportError::NotSupported(format.to_string()));
        }
        let page = store.select(&SelectQuery::new(config.table_name())).await?;
        self.export_rows(config, &page.rows, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tabula_query::ColumnType;
    use tabula_table::{ExportConfig, TableColumn};

    fn config() -> TableConfig {
        TableConfig {
            id: "invoices".into(),
            endpoint: "Invoices".into(),
            columns: vec![
                TableColumn::new("customer", ColumnType::Text),
                TableColumn::new("total", ColumnType::Number),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_quote_field() {
        assert_eq!(quote_field("plain"), "plain");
        assert_eq!(quote_field("a,b"), "\"a,b\"");
        assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(quote_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_csv_body() {
        let rows = vec![
            Row::from_value(json!({"customer": "Acme, Ltd", "total": 12.5})).unwrap(),
            Row::from_value(json!({"customer": "Bolt"})).unwrap(),
        ];
        let file = Exporter::new()
            .export_rows(&config(), &rows, ExportFormat::Csv)
            .unwrap();

        assert_eq!(file.filename, "invoices.csv");
        assert_eq!(
            String::from_utf8(file.bytes).unwrap(),
            "customer,total\r\n\"Acme, Ltd\",12.5\r\nBolt,\r\n"
        );
    }

    #[test]
    fn test_configured_fields_and_filename() {
        let mut config = config();
        config.export = Some(ExportConfig {
            enabled: true,
            formats: vec!["csv".into(), "excel".into()],
            filename: Some("billing".into()),
            fields: vec!["total".into()],
        });

        assert_eq!(export_fields(&config), vec!["total".to_string()]);
        assert_eq!(export_filename(&config, ExportFormat::Csv), "billing.csv");
        assert_eq!(export_filename(&config, ExportFormat::Excel), "billing.xlsx");
    }

    #[test]
    fn test_excel_without_encoder_is_not_supported() {
        let err = Exporter::new()
            .export_rows(&config(), &[], ExportFormat::Excel)
            .unwrap_err();
        assert!(matches!(err, CsvExportError::NotSupported(_)));
    }

    #[test]
    fn test_registered_encoder_is_used() {
        struct FakePdf;
        impl ExportEncoder for FakePdf {
            fn format(&self) -> ExportFormat {
                ExportFormat::Pdf
            }
            fn encode(&self, fields: &[String], rows: &[Row]) -> Result<Vec<u8>, CsvExportError> {
                Ok(format!("%PDF {} {}", fields.len(), rows.len()).into_bytes())
            }
        }

        let exporter = Exporter::new().with_encoder(Arc::new(FakePdf));
        let file = exporter.export_rows(&config(), &[], ExportFormat::Pdf).unwrap();
        assert_eq!(file.bytes, b"%PDF 2 0".to_vec());
        assert_eq!(file.content_type, "application/pdf");
    }

    #[test]
    fn test_disabled_export() {
        let mut config = config();
        config.export = Some(ExportConfig::default());
        assert!(matches!(
            Exporter::new().export_rows(&config, &[], ExportFormat::Csv),
            Err(CsvExportError::Disabled(_))
        ));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert!("docx".parse::<ExportFormat>().is_err());
    }
}
