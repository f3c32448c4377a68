//! Fetch request and response shapes
//!
//! The same request drives the orchestrator's own fetches and the HTTP query
//! endpoint, so a table state always serializes to one backend query.

use serde::{Deserialize, Serialize};
use tabula_core::{Range, Row, RowPage, SelectQuery, SortSpec};
use tabula_query::{FilterValue, PredicateTranslator, TranslateError, Translation};

use crate::lookup::LookupOption;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search_column: String,
    pub search_query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchRequest {
    pub pagination: PageRequest,
    pub filters: Vec<FilterValue>,
    pub sort: Option<SortSpec>,
    pub search: Option<SearchRequest>,
}

impl FetchRequest {
    /// Translate into a backend query for `table`.
    ///
    /// Filters go through the translator (its policy decides about unknown
    /// operators), the search term becomes one more AND-ed predicate, and a
    /// missing sort means `id` ascending.
    pub fn to_query(
        &self,
        table: &str,
        translator: &PredicateTranslator,
    ) -> Result<(SelectQuery, Translation), TranslateError> {
        let translation = translator.translate_all(&self.filters)?;

        let mut query = SelectQuery::new(table)
            .sort(self.sort.clone().unwrap_or_default())
            .range(Range::for_page(
                self.pagination.page.max(1),
                self.pagination.page_size.max(1),
            ));
        query.predicates = translation.predicates.clone();

        if let Some(search) = &self.search
            && let Some(predicate) = translator.search(&search.search_column, &search.search_query)
        {
            query.predicates.push(predicate);
        }

        Ok((query, translation))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub total_items: u64,
    pub total_pages: usize,
    pub current_page: usize,
    pub page_size: usize,
}

/// One page of rows as the query endpoint returns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePage {
    pub items: Vec<Row>,
    pub pagination: PaginationInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub populated_data: Option<Vec<LookupOption>>,
}

impl TablePage {
    pub fn from_rows(page: RowPage, request: &PageRequest) -> Self {
        let page_size = request.page_size.max(1);
        Self {
            items: page.rows,
            pagination: PaginationInfo {
                total_items: page.total_items,
                total_pages: page.total_items.div_ceil(page_size as u64) as usize,
                current_page: request.page.max(1),
                page_size,
            },
            populated_data: None,
        }
    }
}
