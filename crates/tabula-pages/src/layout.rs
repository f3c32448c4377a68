//! Container layout math
//!
//! Containers declare their sub-column widths in 12-unit grid spans. Generic
//! containers choose a grid by column count; the fixed `container1_1` and
//! `container1_2` layouts always sit on a 12-column grid.

use crate::page::{ContentNode, NodeKind};

pub const GRID_UNITS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStyle {
    /// Grid picked from the column count (`container`)
    Adaptive,
    /// Explicit spans on a 12-column grid (`container1_1`, `container1_2`)
    TwelveGrid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLayout {
    columns: Vec<u8>,
    style: LayoutStyle,
}

impl ContainerLayout {
    /// Layout for a generic container. An empty declaration is one full-width column.
    pub fn from_columns(columns: &[u8]) -> Self {
        let columns = if columns.is_empty() {
            vec![GRID_UNITS as u8]
        } else {
            columns.to_vec()
        };
        Self {
            columns,
            style: LayoutStyle::Adaptive,
        }
    }

    pub fn twelve_grid(columns: &[u8]) -> Self {
        Self {
            style: LayoutStyle::TwelveGrid,
            ..Self::from_columns(columns)
        }
    }

    /// Layout for a container node, `None` for non-container nodes
    pub fn for_node(node: &ContentNode) -> Option<Self> {
        match node.kind() {
            NodeKind::Container => Some(Self::from_columns(&node.columns())),
            NodeKind::Container1_1 => Some(Self::twelve_grid(&[12])),
            NodeKind::Container1_2 => Some(Self::twelve_grid(&[6, 6])),
            _ => None,
        }
    }

    pub fn columns(&self) -> &[u8] {
        &self.columns
    }

    pub fn style(&self) -> LayoutStyle {
        self.style
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn total_units(&self) -> u32 {
        self.columns.iter().map(|&c| c as u32).sum()
    }

    pub fn grid_class(&self) -> &'static str {
        if self.style == LayoutStyle::TwelveGrid {
            return "grid grid-cols-12 gap-4 w-full";
        }
        match self.columns.len() {
            1 => "w-full",
            2 => "w-full grid grid-cols-2",
            3 => "w-full grid grid-cols-3",
            4 => "w-full grid grid-cols-4",
            _ => "w-full grid grid-cols-12",
        }
    }

    pub fn column_class(&self, index: usize) -> String {
        let span = self.columns.get(index).copied().unwrap_or(GRID_UNITS as u8);
        match self.style {
            LayoutStyle::Adaptive if self.columns.len() <= 4 => "w-full".to_string(),
            _ => format!("col-span-{}", span),
        }
    }

    /// Warning text when the spans do not add up to a full grid
    pub fn sum_warning(&self) -> Option<String> {
        let total = self.total_units();
        (total != GRID_UNITS).then(|| {
            format!(
                "Container columns should add up to {} (got {})",
                GRID_UNITS, total
            )
        })
    }

    /// Group children by `gridColumn`. Indices past the last column land in it.
    pub fn bucket<'a>(&self, children: &'a [ContentNode]) -> Vec<Vec<&'a ContentNode>> {
        let last = self.columns.len().saturating_sub(1);
        let mut buckets = vec![Vec::new(); self.columns.len()];
        for child in children {
            buckets[child.grid_column().min(last)].push(child);
        }
        buckets
    }
}
