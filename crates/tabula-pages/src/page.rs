//! Page model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_core::{Result, Row, RowId, TabulaError};

/// A stored page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RowId>,

    /// Unique slug the page is served under
    pub page_url: String,

    #[serde(default)]
    pub page_description: String,

    #[serde(default, deserialize_with = "nodes_or_string")]
    pub content: Vec<ContentNode>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn new(page_url: impl Into<String>, content: Vec<ContentNode>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            page_url: page_url.into(),
            page_description: String::new(),
            content,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.page_description = description.into();
        self
    }

    pub fn from_row(row: Row) -> Result<Self> {
        Ok(serde_json::from_value(row.into_value())?)
    }

    pub fn to_row(&self) -> Result<Row> {
        Row::from_value(serde_json::to_value(self)?)
            .ok_or_else(|| TabulaError::validation("page must serialize to an object"))
    }
}

/// Body of a page creation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewPage {
    pub page_url: String,
    pub page_description: String,
    #[serde(deserialize_with = "nodes_or_string")]
    pub content: Vec<ContentNode>,
}

/// One node of a page tree: `{type, name?, config}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    H1,
    H2,
    Heading,
    Paragraph,
    Image,
    Table,
    Container,
    Container1_1,
    Container1_2,
    Unknown(String),
}

impl NodeKind {
    pub fn parse(node_type: &str) -> Self {
        match node_type {
            "h1" => NodeKind::H1,
            "h2" => NodeKind::H2,
            "heading" => NodeKind::Heading,
            "paragraph" => NodeKind::Paragraph,
            "image" => NodeKind::Image,
            "table" => NodeKind::Table,
            "container" => NodeKind::Container,
            "container1_1" => NodeKind::Container1_1,
            "container1_2" => NodeKind::Container1_2,
            other => NodeKind::Unknown(other.to_string()),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::Container | NodeKind::Container1_1 | NodeKind::Container1_2
        )
    }
}

impl ContentNode {
    pub fn new(node_type: impl Into<String>, config: Value) -> Self {
        Self {
            node_type: node_type.into(),
            name: None,
            config,
        }
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::parse(&self.node_type)
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// `config.id`, used as the DOM id of the rendered block
    pub fn dom_id(&self) -> Option<String> {
        match self.config.get("id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Target sub-column inside the parent container; 0 when absent
    pub fn grid_column(&self) -> usize {
        self.config
            .get("gridColumn")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(0)
    }

    /// `config.columns` for generic containers
    pub fn columns(&self) -> Vec<u8> {
        self.config
            .get("columns")
            .and_then(Value::as_array)
            .map(|cols| {
                cols.iter()
                    .filter_map(Value::as_u64)
                    .map(|n| n.min(u8::MAX as u64) as u8)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parsed `config.children`
    pub fn children(&self) -> std::result::Result<Vec<ContentNode>, serde_json::Error> {
        match self.config.get("children") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(children) => serde_json::from_value(children.clone()),
        }
    }
}

/// Some stores keep page content as a JSON string
fn nodes_or_string<'de, D>(deserializer: D) -> std::result::Result<Vec<ContentNode>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => serde_json::from_str(&s).map_err(serde::de::Error::custom),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}
