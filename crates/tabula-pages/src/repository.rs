//! Page persistence
//!
//! Pages live in the `pages` table of any [`RowStore`]. `pageUrl` is unique
//! and enforced here, since not every backend has a unique index.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tabula_core::{Predicate, Result, Row, RowId, RowStore, SelectQuery, TabulaError};

use crate::page::{NewPage, Page};

pub const PAGES_TABLE: &str = "pages";

#[derive(Clone)]
pub struct PageRepository {
    store: Arc<dyn RowStore>,
}

impl PageRepository {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RowStore> {
        &self.store
    }

    /// Every page, in id order. Rows that do not parse are skipped.
    pub async fn list(&self) -> Result<Vec<Page>> {
        let page = self.store.select(&SelectQuery::new(PAGES_TABLE)).await?;
        let mut pages = Vec::with_capacity(page.rows.len());
        for row in page.rows {
            match Page::from_row(row) {
                Ok(page) => pages.push(page),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable page"),
            }
        }
        Ok(pages)
    }

    pub async fn get_by_id(&self, id: &RowId) -> Result<Option<Page>> {
        self.store
            .get(PAGES_TABLE, id)
            .await?
            .map(Page::from_row)
            .transpose()
    }

    pub async fn get_by_url(&self, page_url: &str) -> Result<Page> {
        self.find_by_url(page_url)
            .await?
            .ok_or_else(|| TabulaError::not_found("Page not found"))
    }

    async fn find_by_url(&self, page_url: &str) -> Result<Option<Page>> {
        let query = SelectQuery::new(PAGES_TABLE).filter(Predicate::eq("pageUrl", page_url));
        let page = self.store.select(&query).await?;
        page.rows.into_iter().next().map(Page::from_row).transpose()
    }

    #[tracing::instrument(skip(self, new_page), fields(page_url = %new_page.page_url))]
    pub async fn create(&self, new_page: NewPage) -> Result<Page> {
        let page_url = new_page.page_url.trim();
        if page_url.is_empty() {
            return Err(TabulaError::validation("pageUrl is required"));
        }
        if self.find_by_url(page_url).await?.is_some() {
            return Err(TabulaError::Conflict(
                "A page with this URL already exists".into(),
            ));
        }

        let page = Page::new(page_url, new_page.content)
            .with_description(new_page.page_description);
        let stored = self.store.insert(PAGES_TABLE, page.to_row()?).await?;
        tracing::info!("page created");
        Page::from_row(stored)
    }

    /// Insert a page document as given, only stamping missing timestamps
    pub async fn insert_raw(&self, data: Value) -> Result<Row> {
        let mut row = Row::from_value(data)
            .ok_or_else(|| TabulaError::validation("pageData must be an object"))?;
        let now = Value::String(Utc::now().to_rfc3339());
        for key in ["createdAt", "updatedAt"] {
            if row.get(key).is_none_or(Value::is_null) {
                row.insert(key, now.clone());
            }
        }
        self.store.insert(PAGES_TABLE, row).await
    }

    /// Patch a page. Moving it to a `pageUrl` another page owns is a conflict.
    pub async fn update(&self, id: &RowId, mut patch: Row) -> Result<Page> {
        if let Some(url) = patch.get("pageUrl").and_then(Value::as_str)
            && let Some(existing) = self.find_by_url(url).await?
            && existing.id.as_ref() != Some(id)
        {
            return Err(TabulaError::Conflict(
                "A page with this URL already exists".into(),
            ));
        }

        patch.remove("id");
        patch.remove("createdAt");
        patch.insert("updatedAt", Value::String(Utc::now().to_rfc3339()));
        let stored = self.store.update(PAGES_TABLE, id, patch).await?;
        Page::from_row(stored)
    }
}
