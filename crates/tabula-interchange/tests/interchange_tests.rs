//! Export and import against the in-memory store

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tabula_core::{Row, RowStore};
use tabula_interchange::{CsvImportError, CsvImporter, ExportFormat, Exporter};
use tabula_query::ColumnType;
use tabula_store::MemoryStore;
use tabula_table::{TableColumn, TableConfig};

fn products_config() -> TableConfig {
    let mut name = TableColumn::new("name", ColumnType::Text);
    name.header = "Product Name".into();
    TableConfig {
        id: "products".into(),
        endpoint: "Products".into(),
        columns: vec![
            name,
            TableColumn::new("price", ColumnType::Number),
            TableColumn::new("tags", ColumnType::Text),
        ],
        ..Default::default()
    }
}

fn seeded_store() -> Arc<MemoryStore> {
    let rows = [
        json!({"name": "Widget, large", "price": 12.5, "tags": "tools"}),
        json!({"name": "Gadget \"Pro\"", "price": 40}),
    ];
    Arc::new(MemoryStore::new().with_rows("Products", rows.into_iter().filter_map(Row::from_value)))
}

#[tokio::test]
async fn test_export_table_as_csv() {
    let store = seeded_store();
    let file = Exporter::new()
        .export_table(store.as_ref(), &products_config(), ExportFormat::Csv)
        .await
        .unwrap();

    assert_eq!(file.filename, "products.csv");
    assert_eq!(
        String::from_utf8(file.bytes).unwrap(),
        "name,price,tags\r\n\"Widget, large\",12.5,tools\r\n\"Gadget \"\"Pro\"\"\",40,\r\n"
    );
}

#[tokio::test]
async fn test_exported_file_imports_into_empty_table() {
    let config = products_config();
    let file = Exporter::new()
        .export_table(seeded_store().as_ref(), &config, ExportFormat::Csv)
        .await
        .unwrap();
    let content = String::from_utf8(file.bytes).unwrap();

    let target = Arc::new(MemoryStore::new());
    let report = CsvImporter::new(target.clone(), config)
        .import(&file.filename, &content)
        .await
        .unwrap();

    assert_eq!(report.inserted, 2);
    assert!(report.failed.is_empty());

    let rows = target.rows("Products");
    assert_eq!(rows[0].get("price"), Some(&json!(12.5)));
    assert_eq!(rows[1].get("name"), Some(&json!("Gadget \"Pro\"")));
    assert_eq!(rows[1].get("tags"), None);
}

#[tokio::test]
async fn test_import_matches_headers_and_reports_bad_lines() {
    let target = Arc::new(MemoryStore::new());
    let importer = CsvImporter::new(target.clone(), products_config());
    let csv = "Product Name,price,color\n\
               Lamp, 19 ,red\n\
               Desk,cheap,oak\n\
               Chair,5\n";

    let report = importer.import("upload.CSV", csv).await.unwrap();

    assert_eq!(report.inserted, 1);
    assert_eq!(
        report.failed,
        vec![
            (3, "price: must be a number".to_string()),
            (4, "expected 3 fields, found 2".to_string()),
        ]
    );

    let page = target
        .select(&tabula_core::SelectQuery::new("Products"))
        .await
        .unwrap();
    let lamp = &page.rows[0];
    assert_eq!(lamp.get("name"), Some(&json!("Lamp")));
    assert_eq!(lamp.get("price"), Some(&json!(19)));
    assert_eq!(lamp.get("color"), Some(&json!("red")));
}

#[tokio::test]
async fn test_import_rejects_non_csv_files() {
    let importer = CsvImporter::new(Arc::new(MemoryStore::new()), products_config());
    let err = importer.import("products.xlsx", "name\nLamp").await.unwrap_err();

    assert!(matches!(err, CsvImportError::UnsupportedFile(_)));
    assert_eq!(err.to_string(), "Please upload a CSV file");
}
