//! Builds the schema description handed to the conversion service.
//!
//! The description is rebuilt from engine introspection on every pipeline
//! invocation so it always reflects the current dataset. Column notes come
//! from a static dictionary; anything not listed gets a generic placeholder.

use crate::db::engine::AnalyticsEngine;
use serde::Serialize;
use std::fmt::Write;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: String,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<ColumnDescription>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescription {
    pub tables: Vec<TableDescription>,
}

const GENERIC_NOTE: &str = "Column data";

// (table, column, note) triples describing the DC order dataset.
const COLUMN_NOTES: &[(&str, &str, &str)] = &[
    ("dc_order_lines", "ordered_date", "Date the order was placed"),
    ("dc_order_lines", "ordered_item", "Ordered item number/SKU"),
    ("dc_order_lines", "order_number", "Order number"),
    ("dc_order_lines", "line_id", "Order line ID"),
    ("dc_order_lines", "schedule_ship_date", "Scheduled ship date"),
    ("dc_order_lines", "ordered_quantity", "Ordered quantity"),
    ("dc_order_lines", "reserved_qty", "Reserved quantity"),
    ("dc_order_lines", "sold_to", "Sold to customer"),
    ("dc_order_lines", "dc", "DC/Ship from location"),
    ("dc_order_lines", "ship_to", "Ship to customer"),
    (
        "dc_order_lines",
        "original_line_status",
        "Line status (Ready to Release, Backordered, Release to Warehouse, \
         Staged/Pick Confirmed, Shipped)",
    ),
    (
        "dc_order_lines",
        "hold_applied_flag",
        "1 when a hold was applied to the line, else 0",
    ),
    (
        "dc_order_lines",
        "hold_released_flag",
        "1 when a previously applied hold was released, else 0",
    ),
    (
        "dc_order_lines",
        "routed_flag",
        "1 when the line was sent to the routing system, else 0",
    ),
    ("dc_order_lines", "item_description", "Item description"),
    ("dc_order_lines", "vendor", "Item vendor"),
    ("dc_order_lines", "trip_id", "Trip ID the line is planned on"),
    ("route_plans", "trip_id", "Trip ID"),
    ("route_plans", "route_date", "Date the route runs"),
    ("route_plans", "origin_dc", "DC the route departs from"),
    ("route_plans", "stop_count", "Number of delivery stops on the route"),
    ("route_plans", "total_miles", "Planned route distance in miles"),
    ("route_plans", "status", "Route plan status"),
];

fn note_for(table: &str, column: &str) -> &'static str {
    COLUMN_NOTES
        .iter()
        .find(|(t, c, _)| *t == table && *c == column)
        .map(|(_, _, note)| *note)
        .unwrap_or(GENERIC_NOTE)
}

/// Introspects the engine and produces a fresh schema description.
///
/// There is no error path: an empty dataset yields an empty description, and
/// introspection failures are logged and degrade to the same thing.
pub async fn build(engine: &dyn AnalyticsEngine) -> SchemaDescription {
    let table_names = match engine.list_tables().await {
        Ok(names) => names,
        Err(e) => {
            warn!("schema introspection failed, using empty schema: {}", e);
            return SchemaDescription { tables: Vec::new() };
        }
    };

    let mut tables = Vec::with_capacity(table_names.len());
    for name in table_names {
        let columns = match engine.table_schema(&name).await {
            Ok(columns) => columns,
            Err(e) => {
                warn!(table = %name, "column introspection failed: {}", e);
                continue;
            }
        };
        tables.push(TableDescription {
            columns: columns
                .into_iter()
                .map(|(column, data_type)| ColumnDescription {
                    note: note_for(&name, &column).to_string(),
                    name: column,
                    data_type,
                })
                .collect(),
            name,
        });
    }

    SchemaDescription { tables }
}

impl SchemaDescription {
    /// Plain-text rendering for inclusion in the conversion prompt: one
    /// section per table, one line per column.
    pub fn to_prompt_text(&self) -> String {
        let mut text = String::new();
        for table in &self.tables {
            let _ = writeln!(text, "Table: {}", table.name);
            for column in &table.columns {
                let _ = writeln!(
                    text,
                    "  {} ({}) - {}",
                    column.name, column.data_type, column.note
                );
            }
            text.push('\n');
        }
        text
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::engine::{EngineError, Row};
    use async_trait::async_trait;

    struct FakeEngine {
        fail: bool,
    }

    #[async_trait]
    impl AnalyticsEngine for FakeEngine {
        async fn list_tables(&self) -> Result<Vec<String>, EngineError> {
            if self.fail {
                return Err(EngineError::Connection("pool exhausted".into()));
            }
            Ok(vec!["dc_order_lines".to_string()])
        }

        async fn table_schema(&self, _table: &str) -> Result<Vec<(String, String)>, EngineError> {
            Ok(vec![
                ("sold_to".to_string(), "VARCHAR".to_string()),
                ("mystery_col".to_string(), "INTEGER".to_string()),
            ])
        }

        async fn run_query(&self, _sql: &str) -> Result<Vec<Row>, EngineError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_known_columns_get_dictionary_notes() {
        let schema = build(&FakeEngine { fail: false }).await;
        let table = &schema.tables[0];
        assert_eq!(table.columns[0].note, "Sold to customer");
    }

    #[tokio::test]
    async fn test_unknown_columns_get_placeholder() {
        let schema = build(&FakeEngine { fail: false }).await;
        let table = &schema.tables[0];
        assert_eq!(table.columns[1].note, GENERIC_NOTE);
    }

    #[tokio::test]
    async fn test_introspection_failure_yields_empty_description() {
        let schema = build(&FakeEngine { fail: true }).await;
        assert!(schema.tables.is_empty());
        assert_eq!(schema.to_prompt_text(), "");
    }

    #[tokio::test]
    async fn test_prompt_text_lists_every_column() {
        let schema = build(&FakeEngine { fail: false }).await;
        let text = schema.to_prompt_text();
        assert!(text.contains("Table: dc_order_lines"));
        assert!(text.contains("sold_to (VARCHAR) - Sold to customer"));
        assert!(text.contains("mystery_col (INTEGER) - Column data"));
    }
}
