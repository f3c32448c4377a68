use serde::{Deserialize, Serialize};
use tabula_core::SortSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort column and direction as the header shows them.
///
/// Clicking the same header cycles asc, desc, none. Clicking a different
/// header starts that column at asc.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortingState {
    pub column: Option<String>,
    pub direction: Option<SortDirection>,
}

impl SortingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: Some(column.into()),
            direction: Some(SortDirection::Asc),
        }
    }

    pub fn toggle(&mut self, column: &str) {
        let next = match (&self.column, self.direction) {
            (Some(current), Some(SortDirection::Asc)) if current == column => {
                Some(SortDirection::Desc)
            }
            (Some(current), Some(SortDirection::Desc)) if current == column => None,
            _ => Some(SortDirection::Asc),
        };

        match next {
            Some(direction) => {
                self.column = Some(column.to_string());
                self.direction = Some(direction);
            }
            None => self.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.column = None;
        self.direction = None;
    }

    pub fn is_unset(&self) -> bool {
        self.column.is_none() || self.direction.is_none()
    }

    /// Direction shown for `column`'s header
    pub fn direction_for(&self, column: &str) -> Option<SortDirection> {
        match &self.column {
            Some(current) if current == column => self.direction,
            _ => None,
        }
    }

    /// Sort sent to the backend; `id` ascending when unset
    pub fn effective(&self) -> SortSpec {
        match (&self.column, self.direction) {
            (Some(column), Some(direction)) => {
                SortSpec::new(column.clone(), direction == SortDirection::Asc)
            }
            _ => SortSpec::default(),
        }
    }
}
