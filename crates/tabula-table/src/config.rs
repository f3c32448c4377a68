//! Table configuration
//!
//! Static, per-table declarations loaded from JSON. Configuration is never
//! mutated at runtime; values discovered later (lookup options) live in
//! [`LookupResults`](crate::LookupResults).

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_core::{Result, TabulaError};
use tabula_query::{ColumnType, FilterOperator};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableConfig {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Backend table (or collection) name
    pub endpoint: String,
    pub columns: Vec<TableColumn>,
    pub search: Option<SearchConfig>,
    pub kanban: Option<KanbanConfig>,
    pub pagination: Option<PaginationConfig>,
    pub filter: Option<FilterConfig>,
    pub column_toggle: Option<ColumnToggleConfig>,
    pub export: Option<ExportConfig>,
    pub import: Option<ImportConfig>,
    pub select: Option<SelectConfig>,
    pub edit: Option<EditConfig>,
    pub bulk_edit: Option<BulkEditConfig>,
}

impl TableConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load every `*.json` file in `dir`, sorted by file name
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        paths
            .iter()
            .map(|path| {
                let json = std::fs::read_to_string(path)?;
                Self::from_json_str(&json).map_err(|e| {
                    TabulaError::Configuration(format!("{}: {}", path.display(), e))
                })
            })
            .collect()
    }

    /// Structural checks that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(TabulaError::Configuration("table id must not be empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for column in &self.columns {
            if column.accessor_key.is_empty() {
                return Err(TabulaError::Configuration(format!(
                    "table '{}': column '{}' has no accessorKey",
                    self.id, column.header
                )));
            }
            if !seen.insert(column.accessor_key.as_str()) {
                return Err(TabulaError::Configuration(format!(
                    "table '{}': duplicate column '{}'",
                    self.id, column.accessor_key
                )));
            }
        }
        if let Some(page_size) = self.pagination.as_ref().map(|p| p.page_size)
            && page_size == 0
        {
            return Err(TabulaError::Configuration(format!(
                "table '{}': pageSize must be positive",
                self.id
            )));
        }
        Ok(())
    }

    /// Backend table name; falls back to the table id
    pub fn table_name(&self) -> &str {
        if self.endpoint.is_empty() {
            &self.id
        } else {
            &self.endpoint
        }
    }

    /// Look up a column by accessor key, then by id
    pub fn column(&self, key: &str) -> Option<&TableColumn> {
        self.columns
            .iter()
            .find(|c| c.accessor_key == key)
            .or_else(|| self.columns.iter().find(|c| c.id.as_deref() == Some(key)))
    }

    /// Column searched by the free-text box: first searchable column, else `name`
    pub fn search_column(&self) -> &str {
        self.search
            .as_ref()
            .and_then(|s| s.searchable_columns.first())
            .map(String::as_str)
            .unwrap_or("name")
    }

    pub fn page_size(&self) -> usize {
        self.pagination.as_ref().map(|p| p.page_size).unwrap_or(10)
    }

    pub fn edit_enabled(&self) -> bool {
        self.edit.as_ref().is_some_and(|e| e.enabled)
    }

    pub fn allows_update(&self) -> bool {
        self.edit
            .as_ref()
            .is_some_and(|e| e.enabled && e.allow_update.unwrap_or(true))
    }

    pub fn allows_add(&self) -> bool {
        self.edit
            .as_ref()
            .is_some_and(|e| e.enabled && e.allow_add.unwrap_or(true))
    }

    pub fn allows_delete(&self) -> bool {
        self.edit
            .as_ref()
            .is_some_and(|e| e.enabled && e.allow_delete.unwrap_or(true))
    }

    pub fn select_mode(&self) -> Option<SelectMode> {
        self.select.as_ref().filter(|s| s.enabled).map(|s| s.mode)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableColumn {
    pub id: Option<String>,
    pub header: String,
    /// Dot-path into the row; one level of nesting is supported
    pub accessor_key: String,
    pub class_name: Option<String>,
    pub sortable: bool,
    pub filterable: bool,
    pub editable: bool,
    pub edit_config: Option<FormFieldConfig>,
    pub default_visible: bool,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub options: Vec<SelectOption>,
    pub array_type: Option<String>,
    /// Foreign-key column resolved through a lookup table
    pub populate: Option<PopulateConfig>,
}

impl Default for TableColumn {
    fn default() -> Self {
        Self {
            id: None,
            header: String::new(),
            accessor_key: String::new(),
            class_name: None,
            sortable: false,
            filterable: false,
            editable: false,
            edit_config: None,
            default_visible: true,
            column_type: ColumnType::Text,
            options: Vec::new(),
            array_type: None,
            populate: None,
        }
    }
}

impl TableColumn {
    pub fn new(accessor_key: impl Into<String>, column_type: ColumnType) -> Self {
        let accessor_key = accessor_key.into();
        Self {
            header: accessor_key.clone(),
            accessor_key,
            column_type,
            ..Default::default()
        }
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_edit_config(mut self, edit_config: FormFieldConfig) -> Self {
        self.edit_config = Some(edit_config);
        self
    }

    pub fn with_populate(mut self, table: impl Into<String>, source: impl Into<String>) -> Self {
        self.populate = Some(PopulateConfig {
            table: table.into(),
            source: source.into(),
        });
        self
    }

    /// Label of the option whose value matches `value`
    pub fn option_label(&self, value: &Value) -> Option<&str> {
        self.options
            .iter()
            .find(|o| &o.value == value)
            .map(|o| o.label.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: Value,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormFieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub label: String,
    pub placeholder: Option<String>,
    pub options: Vec<SelectOption>,
    pub validation: Option<FieldValidation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldValidation {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulateConfig {
    /// Table holding the referenced rows
    pub table: String,
    /// Field of the referenced row used as the display label
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    pub enabled: bool,
    pub placeholder: Option<String>,
    pub searchable_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KanbanConfig {
    pub enabled: bool,
    /// Field identifying a card (usually `id`)
    pub identification: String,
    /// Field shown as the card's content
    pub column_id_name: String,
    /// Status field deciding which column a card sits in
    pub column_content: String,
    pub column_options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationConfig {
    pub enabled: bool,
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_size: 10,
            page_size_options: vec![10, 20, 50],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    pub enabled: bool,
    pub operators: Vec<FilterOperator>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnToggleConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    pub enabled: bool,
    pub formats: Vec<String>,
    pub filename: Option<String>,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    pub enabled: bool,
    pub formats: Vec<String>,
    pub template: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectMode {
    Single,
    #[default]
    Multiple,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectConfig {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub mode: SelectMode,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditConfig {
    pub enabled: bool,
    pub allow_add: Option<bool>,
    pub allow_delete: Option<bool>,
    pub allow_update: Option<bool>,
    pub confirm_delete: Option<bool>,
    pub messages: Option<EditMessages>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditMessages {
    pub delete_confirm: Option<DeleteConfirmMessages>,
    pub success: Option<OperationMessages>,
    pub error: Option<OperationMessages>,
    pub loading: Option<OperationMessages>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteConfirmMessages {
    pub title: Option<String>,
    pub description: Option<String>,
    pub confirm: Option<String>,
    pub cancel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationMessages {
    pub update: Option<String>,
    pub delete: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BulkEditConfig {
    pub enabled: bool,
    pub fields: Vec<FormFieldConfig>,
    pub allow_delete: bool,
}
