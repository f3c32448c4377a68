//! Kanban view
//!
//! Rows become cards grouped by one status-like field. Moving a card to
//! another column changes only that field; order within a column is a
//! display concern and is never persisted.

use serde::Serialize;
use serde_json::Value;
use tabula_core::{Predicate, Result, Row, RowId, RowStore, SelectQuery, record_not_found};

use crate::config::KanbanConfig;
use crate::error::{TableError, TableResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanCard {
    pub id: String,
    pub column_id: String,
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KanbanColumn {
    pub id: String,
    pub title: String,
    pub cards: Vec<KanbanCard>,
}

/// A card moved to another column, and the single-field patch that persists it
#[derive(Debug, Clone, PartialEq)]
pub struct KanbanMove {
    pub card_id: String,
    pub patch: Row,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KanbanBoard {
    pub columns: Vec<KanbanColumn>,
    /// Cards whose status matches none of the configured columns
    pub unassigned: Vec<KanbanCard>,
    #[serde(skip)]
    status_field: String,
}

impl KanbanBoard {
    pub fn build(config: &KanbanConfig, rows: &[Row]) -> Self {
        let mut columns: Vec<KanbanColumn> = config
            .column_options
            .iter()
            .map(|option| KanbanColumn {
                id: option.clone(),
                title: option.clone(),
                cards: Vec::new(),
            })
            .collect();
        let mut unassigned = Vec::new();

        for row in rows {
            let Some(id) = row.get_path(&config.identification).and_then(RowId::from_value) else {
                tracing::debug!(field = %config.identification, "row without card id left off the board");
                continue;
            };
            let column_id = row
                .get_path(&config.column_content)
                .map(value_text)
                .unwrap_or_default();
            let card = KanbanCard {
                id: id.to_string(),
                column_id,
                content: row
                    .get_path(&config.column_id_name)
                    .cloned()
                    .unwrap_or(Value::Null),
            };

            match columns.iter_mut().find(|c| c.id == card.column_id) {
                Some(column) => column.cards.push(card),
                None => unassigned.push(card),
            }
        }

        Self {
            columns,
            unassigned,
            status_field: config.column_content.clone(),
        }
    }

    pub fn column(&self, id: &str) -> Option<&KanbanColumn> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn card(&self, id: &str) -> Option<&KanbanCard> {
        self.columns
            .iter()
            .flat_map(|c| c.cards.iter())
            .chain(self.unassigned.iter())
            .find(|card| card.id == id)
    }

    /// Move a card to `position` in `to_column`.
    ///
    /// Returns the patch to persist when the card changed column, `None` when
    /// it was only reordered.
    pub fn move_card(
        &mut self,
        card_id: &str,
        to_column: &str,
        position: usize,
    ) -> TableResult<Option<KanbanMove>> {
        let target = self
            .columns
            .iter()
            .position(|c| c.id == to_column)
            .ok_or_else(|| TableError::UnknownKanbanColumn(to_column.to_string()))?;
        let card = self.take_card(card_id)?;
        let changed = card.column_id != to_column;

        let mut card = card;
        card.column_id = to_column.to_string();
        let cards = &mut self.columns[target].cards;
        cards.insert(position.min(cards.len()), card);

        if !changed {
            return Ok(None);
        }
        Ok(Some(KanbanMove {
            card_id: card_id.to_string(),
            patch: Row::new().with(self.status_field.clone(), to_column),
        }))
    }

    fn take_card(&mut self, card_id: &str) -> TableResult<KanbanCard> {
        for column in &mut self.columns {
            if let Some(index) = column.cards.iter().position(|c| c.id == card_id) {
                return Ok(column.cards.remove(index));
            }
        }
        match self.unassigned.iter().position(|c| c.id == card_id) {
            Some(index) => Ok(self.unassigned.remove(index)),
            None => Err(TableError::UnknownCard(card_id.to_string())),
        }
    }
}

/// Every row of `table` that the board needs
pub async fn load_board(store: &dyn RowStore, table: &str, config: &KanbanConfig) -> Result<KanbanBoard> {
    let page = store.select(&SelectQuery::new(table)).await?;
    Ok(KanbanBoard::build(config, &page.rows))
}

/// Write a move to the store, keyed by the board's identification field
pub async fn persist_move(
    store: &dyn RowStore,
    table: &str,
    config: &KanbanConfig,
    change: &KanbanMove,
) -> Result<Row> {
    let card_id = RowId::new(change.card_id.clone());
    let id = match config.identification.as_str() {
        "" | "id" | "_id" => card_id,
        field => {
            let query = SelectQuery::new(table).filter(Predicate::eq(field, card_id.to_value()));
            store
                .select(&query)
                .await?
                .rows
                .first()
                .and_then(Row::id)
                .ok_or_else(|| record_not_found(&card_id))?
        }
    };
    store.update(table, &id, change.patch.clone()).await
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config() -> KanbanConfig {
        KanbanConfig {
            enabled: true,
            identification: "id".into(),
            column_id_name: "name".into(),
            column_content: "status".into(),
            column_options: vec!["Active".into(), "Inactive".into(), "Suspended".into()],
        }
    }

    fn rows() -> Vec<Row> {
        [
            json!({"id": 1, "name": "Anna", "status": "Active"}),
            json!({"id": 2, "name": "Bob", "status": "Inactive"}),
            json!({"id": 3, "name": "Diana", "status": "Active"}),
            json!({"id": 4, "name": "Eve", "status": "Archived"}),
        ]
        .into_iter()
        .map(|v| Row::from_value(v).unwrap())
        .collect()
    }

    #[test]
    fn test_build_groups_by_status() {
        let board = KanbanBoard::build(&config(), &rows());

        let titles: Vec<_> = board.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Active", "Inactive", "Suspended"]);
        let active: Vec<_> = board.columns[0].cards.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(active, vec!["1", "3"]);
        assert_eq!(board.unassigned.len(), 1);
        assert_eq!(board.card("2").unwrap().content, json!("Bob"));
    }

    #[test]
    fn test_reorder_within_column_is_not_persisted() {
        let mut board = KanbanBoard::build(&config(), &rows());
        assert_eq!(board.move_card("3", "Active", 0).unwrap(), None);
        let active: Vec<_> = board.columns[0].cards.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(active, vec!["3", "1"]);
    }

    #[test]
    fn test_move_across_columns_patches_status_only() {
        let mut board = KanbanBoard::build(&config(), &rows());
        let change = board.move_card("1", "Suspended", 5).unwrap().unwrap();

        assert_eq!(change.card_id, "1");
        assert_eq!(change.patch.into_value(), json!({"status": "Suspended"}));
        assert_eq!(board.column("Suspended").unwrap().cards[0].column_id, "Suspended");
        assert_eq!(board.column("Active").unwrap().cards.len(), 1);
    }

    #[test]
    fn test_unknown_targets() {
        let mut board = KanbanBoard::build(&config(), &rows());
        assert_eq!(
            board.move_card("1", "Done", 0),
            Err(TableError::UnknownKanbanColumn("Done".into()))
        );
        assert_eq!(
            board.move_card("99", "Active", 0),
            Err(TableError::UnknownCard("99".into()))
        );
    }
}
