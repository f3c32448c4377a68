use std::collections::BTreeSet;

use tabula_core::Row;

use crate::config::SelectMode;

/// Selected row indices on the displayed page.
///
/// Indices refer to the current page only and are cleared whenever the page,
/// sort or filters change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    mode: SelectMode,
    indices: BTreeSet<usize>,
}

impl Selection {
    pub fn new(mode: SelectMode) -> Self {
        Self {
            mode,
            indices: BTreeSet::new(),
        }
    }

    pub fn mode(&self) -> SelectMode {
        self.mode
    }

    /// Flip one row; in single mode selecting a row replaces the previous one
    pub fn toggle(&mut self, index: usize) {
        if self.indices.remove(&index) {
            return;
        }
        if self.mode == SelectMode::Single {
            self.indices.clear();
        }
        self.indices.insert(index);
    }

    /// Select every row on a page of `count` rows. Single mode ignores this.
    pub fn select_all(&mut self, count: usize) {
        if self.mode == SelectMode::Multiple {
            self.indices = (0..count).collect();
        }
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn selected_rows<'a>(&self, rows: &'a [Row]) -> Vec<&'a Row> {
        self.indices.iter().filter_map(|&i| rows.get(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_multiple_mode() {
        let mut selection = Selection::new(SelectMode::Multiple);
        selection.toggle(2);
        selection.toggle(0);
        selection.toggle(2);
        assert_eq!(selection.indices().collect::<Vec<_>>(), vec![0]);

        selection.select_all(3);
        assert_eq!(selection.len(), 3);
    }

    #[test]
    fn test_single_mode_keeps_one() {
        let mut selection = Selection::new(SelectMode::Single);
        selection.toggle(1);
        selection.toggle(4);
        selection.select_all(10);
        assert_eq!(selection.indices().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_selected_rows_skips_stale_indices() {
        let rows = vec![
            Row::from_value(json!({"id": 1})).unwrap(),
            Row::from_value(json!({"id": 2})).unwrap(),
        ];
        let mut selection = Selection::new(SelectMode::Multiple);
        selection.toggle(1);
        selection.toggle(7);
        let selected = selection.selected_rows(&rows);
        assert_eq!(selected, vec![&rows[1]]);
    }
}
