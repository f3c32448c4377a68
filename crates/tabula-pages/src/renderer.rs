//! Page-tree renderer
//!
//! Produces one HTML block per content node, descending into containers.
//! Table nodes fetch their first page through a [`TableOrchestrator`].

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use minijinja::context;
use tabula_core::RowStore;
use tabula_table::{TableConfig, TableOrchestrator};
use thiserror::Error;

use crate::layout::ContainerLayout;
use crate::page::{ContentNode, NodeKind, Page};
use crate::templates::{self, BlockTemplates};

pub const DEFAULT_IMAGE_HEIGHT: u64 = 300;

/// What to do with a node whose type is not recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownNodePolicy {
    /// Render nothing for the node and record a diagnostic
    #[default]
    Skip,
    /// Fail the whole render
    Reject,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("Unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("Invalid config for '{node}' node: {message}")]
    InvalidConfig { node: String, message: String },

    #[error("Table '{table}' failed to load: {message}")]
    TableFailed { table: String, message: String },

    #[error("Template error: {0}")]
    Template(String),
}

impl From<minijinja::Error> for RenderError {
    fn from(e: minijinja::Error) -> Self {
        RenderError::Template(e.to_string())
    }
}

impl From<RenderError> for tabula_core::TabulaError {
    fn from(e: RenderError) -> Self {
        tabula_core::TabulaError::Validation(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock {
    pub node_type: String,
    pub html: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedPage {
    pub blocks: Vec<RenderedBlock>,
    /// Problems that did not stop the render
    pub diagnostics: Vec<RenderError>,
}

impl RenderedPage {
    pub fn to_html(&self) -> String {
        self.blocks.iter().map(|b| b.html.as_str()).collect()
    }
}

pub struct PageRenderer {
    store: Arc<dyn RowStore>,
    policy: UnknownNodePolicy,
    templates: BlockTemplates,
}

impl PageRenderer {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            store,
            policy: UnknownNodePolicy::default(),
            templates: BlockTemplates::new(),
        }
    }

    pub fn with_policy(mut self, policy: UnknownNodePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> UnknownNodePolicy {
        self.policy
    }

    #[tracing::instrument(skip(self, page), fields(page_url = %page.page_url, nodes = page.content.len()))]
    pub async fn render(&self, page: &Page) -> Result<RenderedPage, RenderError> {
        let mut rendered = RenderedPage::default();
        for node in &page.content {
            if let Some(block) = self.render_node(node, &mut rendered.diagnostics).await? {
                rendered.blocks.push(block);
            }
        }
        if !rendered.diagnostics.is_empty() {
            tracing::debug!(diagnostics = rendered.diagnostics.len(), "page rendered with diagnostics");
        }
        Ok(rendered)
    }

    fn render_node<'a>(
        &'a self,
        node: &'a ContentNode,
        diagnostics: &'a mut Vec<RenderError>,
    ) -> BoxFuture<'a, Result<Option<RenderedBlock>, RenderError>> {
        async move {
            let kind = node.kind();
            let inner = match &kind {
                NodeKind::H1 | NodeKind::H2 | NodeKind::Paragraph => {
                    let template = match kind {
                        NodeKind::H1 => templates::H1,
                        NodeKind::H2 => templates::H2,
                        _ => templates::PARAGRAPH,
                    };
                    let text = node.config_str("content").unwrap_or_default();
                    self.templates.render(template, context! { text => text })?
                }
                NodeKind::Heading => {
                    let text = node
                        .config_str("heading")
                        .or_else(|| node.config_str("content"))
                        .unwrap_or_default();
                    self.templates.render(
                        templates::HEADING,
                        context! { text => text, class => node.config_str("className") },
                    )?
                }
                NodeKind::Image => match node.config_str("src").or_else(|| node.config_str("content")) {
                    Some(src) => {
                        let height = node
                            .config
                            .get("height")
                            .and_then(serde_json::Value::as_u64)
                            .filter(|&h| h > 0)
                            .unwrap_or(DEFAULT_IMAGE_HEIGHT);
                        let alt = node.config_str("alt").unwrap_or("Content image");
                        self.templates.render(
                            templates::IMAGE,
                            context! { src => src, alt => alt, height => height },
                        )?
                    }
                    None => {
                        diagnostics.push(RenderError::InvalidConfig {
                            node: node.node_type.clone(),
                            message: "image has no source".to_string(),
                        });
                        return Ok(None);
                    }
                },
                NodeKind::Table => self.render_table(node, diagnostics).await?,
                NodeKind::Container | NodeKind::Container1_1 | NodeKind::Container1_2 => {
                    match self.render_container(node, diagnostics).await? {
                        Some(html) => html,
                        None => return Ok(None),
                    }
                }
                NodeKind::Unknown(node_type) => {
                    let error = RenderError::UnknownNodeType(node_type.clone());
                    match self.policy {
                        UnknownNodePolicy::Reject => return Err(error),
                        UnknownNodePolicy::Skip => {
                            tracing::warn!(node_type = %node_type, "skipping unknown node type");
                            diagnostics.push(error);
                            return Ok(None);
                        }
                    }
                }
            };

            let html = if kind.is_container() {
                inner
            } else {
                self.templates.render(
                    templates::WRAPPER,
                    context! { id => node.dom_id(), inner => inner },
                )?
            };

            Ok(Some(RenderedBlock {
                node_type: node.node_type.clone(),
                html,
            }))
        }
        .boxed()
    }

    async fn render_container(
        &self,
        node: &ContentNode,
        diagnostics: &mut Vec<RenderError>,
    ) -> Result<Option<String>, RenderError> {
        let Some(layout) = ContainerLayout::for_node(node) else {
            return Ok(None);
        };
        if let Some(warning) = layout.sum_warning() {
            tracing::warn!(columns = ?layout.columns(), "{}", warning);
        }

        let children = match node.children() {
            Ok(children) => children,
            Err(e) => {
                diagnostics.push(RenderError::InvalidConfig {
                    node: node.node_type.clone(),
                    message: format!("invalid children: {}", e),
                });
                Vec::new()
            }
        };

        let mut columns = Vec::with_capacity(layout.column_count());
        for (index, bucket) in layout.bucket(&children).into_iter().enumerate() {
            let mut blocks = Vec::with_capacity(bucket.len());
            for child in bucket {
                if let Some(block) = self.render_node(child, &mut *diagnostics).await? {
                    blocks.push(block.html);
                }
            }
            columns.push(context! { class => layout.column_class(index), blocks => blocks });
        }

        let html = self.templates.render(
            templates::CONTAINER,
            context! { grid_class => layout.grid_class(), columns => columns },
        )?;
        Ok(Some(html))
    }

    async fn render_table(
        &self,
        node: &ContentNode,
        diagnostics: &mut Vec<RenderError>,
    ) -> Result<String, RenderError> {
        let config = match parse_table_config(node) {
            Ok(config) => config,
            Err(message) => {
                let error = RenderError::InvalidConfig {
                    node: node.node_type.clone(),
                    message,
                };
                let html = self.templates.render(
                    templates::TABLE_ERROR,
                    context! { table_id => "", message => error.to_string() },
                )?;
                diagnostics.push(error);
                return Ok(html);
            }
        };

        let mut table = TableOrchestrator::new(config, self.store.clone());
        if let Err(e) = table.refresh().await {
            let message = e.user_message();
            tracing::warn!(table = %table.config().id, error = %message, "embedded table failed to load");
            diagnostics.push(RenderError::TableFailed {
                table: table.config().id.clone(),
                message: message.clone(),
            });
            return Ok(self.templates.render(
                templates::TABLE_ERROR,
                context! { table_id => table.config().id.clone(), message => message },
            )?);
        }
        table.load_lookups().await;

        let columns: Vec<_> = table
            .config()
            .columns
            .iter()
            .filter(|c| c.default_visible)
            .collect();
        let headers: Vec<&str> = columns.iter().map(|c| c.header.as_str()).collect();
        let rows: Vec<Vec<String>> = (0..table.rows().len())
            .map(|row| {
                columns
                    .iter()
                    .map(|c| table.cell_text(row, &c.accessor_key).unwrap_or_default())
                    .collect()
            })
            .collect();

        let page = table.page();
        Ok(self.templates.render(
            templates::TABLE,
            context! {
                table_id => table.config().id.clone(),
                title => table.config().title.clone(),
                headers => headers,
                rows => rows,
                current_page => page.pagination.current_page,
                total_pages => page.pagination.total_pages.max(1),
                total_items => page.pagination.total_items,
            },
        )?)
    }
}

fn parse_table_config(node: &ContentNode) -> Result<TableConfig, String> {
    let config: TableConfig =
        serde_json::from_value(node.config.clone()).map_err(|e| e.to_string())?;
    config.validate().map_err(|e| e.user_message())?;
    Ok(config)
}
