use serde::{Deserialize, Serialize};
use tabula_core::Range;

/// Page position and totals.
///
/// The client owns `page_index` (0-based) and `page_size`; the server owns
/// `total_items` and `total_pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    pub page_index: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: u64,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PaginationState {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_index: 0,
            page_size: page_size.max(1),
            total_pages: 0,
            total_items: 0,
        }
    }

    /// Move to `index`, clamped to the known pages
    pub fn set_page_index(&mut self, index: usize) {
        self.page_index = match self.total_pages {
            0 => index,
            pages => index.min(pages - 1),
        };
    }

    pub fn next(&mut self) -> bool {
        if self.has_next() {
            self.page_index += 1;
            true
        } else {
            false
        }
    }

    pub fn previous(&mut self) -> bool {
        if self.page_index > 0 {
            self.page_index -= 1;
            true
        } else {
            false
        }
    }

    pub fn has_next(&self) -> bool {
        self.page_index.saturating_add(1) < self.total_pages
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page_index = 0;
    }

    pub fn reset(&mut self) {
        self.page_index = 0;
    }

    pub fn apply_totals(&mut self, total_items: u64) {
        self.total_items = total_items;
        self.total_pages = total_items.div_ceil(self.page_size as u64) as usize;
    }

    /// 1-based page number sent to the backend
    pub fn wire_page(&self) -> usize {
        self.page_index.saturating_add(1)
    }

    pub fn range(&self) -> Range {
        Range::for_index(self.page_index, self.page_size)
    }
}
