//! Tabula table interchange
//!
//! Moves table rows in and out of files:
//!
//! ```text
//! RowStore → Exporter → ExportEncoder (csv built in; excel/pdf plugged in) → ExportFile
//! upload.csv → CsvImporter → column coercion → RowStore::insert → ImportReport
//! ```

mod csv_export;
mod csv_import;

pub use csv_export::{
    CsvEncoder, CsvExportError, ExportEncoder, ExportFile, ExportFormat, Exporter, export_fields,
    export_filename, quote_field,
};
pub use csv_import::{CsvImportError, CsvImporter, ImportReport, parse_csv, parse_csv_line};
