//! Validated SQL execution with timing capture.

use crate::db::engine::{AnalyticsEngine, Row};
use crate::query::error::QueryError;
use crate::query::validator;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

/// Outcome of one successful query execution.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub execution_time_ms: f64,
    pub sql: String,
}

impl QueryResult {
    /// Column order follows the first row's key order; an empty result has
    /// no columns.
    pub fn from_rows(rows: Vec<Row>, execution_time_ms: f64, sql: String) -> Self {
        let columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            row_count: rows.len(),
            rows,
            columns,
            execution_time_ms,
            sql,
        }
    }
}

/// Runs a SQL candidate through the safety gate and then the engine.
///
/// A validator rejection fails immediately as `sql-syntax`; an engine
/// failure surfaces as `execution` with the raw engine message preserved
/// for diagnostics.
pub async fn execute(engine: &dyn AnalyticsEngine, sql: &str) -> Result<QueryResult, QueryError> {
    let verdict = validator::validate(sql);
    if !verdict.valid {
        let reason = verdict.error.unwrap_or_else(|| "Invalid SQL".to_string());
        return Err(QueryError::sql_syntax(reason, sql));
    }

    let started = Instant::now();
    let rows = engine
        .run_query(sql)
        .await
        .map_err(|e| QueryError::execution(e.to_string(), sql))?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    debug!(
        rows = rows.len(),
        elapsed_ms = format!("{:.1}", elapsed_ms),
        "query executed"
    );

    Ok(QueryResult::from_rows(rows, elapsed_ms, sql.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::engine::EngineError;
    use crate::query::error::ErrorKind;
    use async_trait::async_trait;
    use serde_json::json;

    struct CannedEngine {
        rows: Vec<Row>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl AnalyticsEngine for CannedEngine {
        async fn list_tables(&self) -> Result<Vec<String>, EngineError> {
            Ok(Vec::new())
        }

        async fn table_schema(&self, _table: &str) -> Result<Vec<(String, String)>, EngineError> {
            Ok(Vec::new())
        }

        async fn run_query(&self, _sql: &str) -> Result<Vec<Row>, EngineError> {
            match &self.fail_with {
                Some(message) => Err(EngineError::Query(message.clone())),
                None => Ok(self.rows.clone()),
            }
        }
    }

    fn row(value: serde_json::Value) -> Row {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_invalid_sql_rejected_before_engine() {
        let engine = CannedEngine {
            rows: Vec::new(),
            fail_with: Some("engine must not be reached".to_string()),
        };
        let err = execute(&engine, "DROP TABLE dc_order_lines").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::SqlSyntax);
        assert_eq!(err.sql, "DROP TABLE dc_order_lines");
    }

    #[tokio::test]
    async fn test_columns_derived_from_first_row() {
        let engine = CannedEngine {
            rows: vec![
                row(json!({"dc": "DC04", "total_units": 120})),
                row(json!({"dc": "DC07", "total_units": 95})),
            ],
            fail_with: None,
        };
        let result = execute(&engine, "SELECT dc, total_units FROM t").await.unwrap();
        assert_eq!(result.columns, vec!["dc", "total_units"]);
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows.len(), result.row_count);
    }

    #[tokio::test]
    async fn test_empty_result_has_no_columns() {
        let engine = CannedEngine { rows: Vec::new(), fail_with: None };
        let result = execute(&engine, "SELECT * FROM t WHERE 1 = 0").await.unwrap();
        assert_eq!(result.row_count, 0);
        assert!(result.columns.is_empty());
    }

    #[tokio::test]
    async fn test_engine_failure_maps_to_execution_kind() {
        let engine = CannedEngine {
            rows: Vec::new(),
            fail_with: Some("Binder Error: column nope not found".to_string()),
        };
        let err = execute(&engine, "SELECT nope FROM t").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Execution);
        assert!(err.message.contains("Binder Error"));
    }
}
