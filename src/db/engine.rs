//! Embedded analytical engine access.
//!
//! DuckDB connections are not `Sync`, so every query runs on a blocking task
//! with its own pooled connection. The trait exists so the executor and
//! pipeline can be tested against a canned in-memory engine.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection;
use r2d2::{ManageConnection, Pool};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;

pub type Row = Map<String, Value>;

#[derive(Debug)]
pub enum EngineError {
    Connection(String),
    Query(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Connection(msg) => write!(f, "engine connection error: {}", msg),
            EngineError::Query(msg) => write!(f, "engine query error: {}", msg),
        }
    }
}

impl Error for EngineError {}

/// The three operations the query pipeline needs from the engine.
#[async_trait]
pub trait AnalyticsEngine: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<String>, EngineError>;
    async fn table_schema(&self, table: &str) -> Result<Vec<(String, String)>, EngineError>;
    async fn run_query(&self, sql: &str) -> Result<Vec<Row>, EngineError>;
}

pub struct DuckDBConnectionManager {
    connection_string: String,
}

impl DuckDBConnectionManager {
    pub fn new(connection_string: String) -> Self {
        Self { connection_string }
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        Connection::open(&self.connection_string)
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// DuckDB-backed engine over an r2d2 connection pool.
pub struct DuckDbEngine {
    pool: Pool<DuckDBConnectionManager>,
}

impl DuckDbEngine {
    pub fn new(pool: Pool<DuckDBConnectionManager>) -> Self {
        Self { pool }
    }

    async fn with_connection<T, F>(&self, op: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, EngineError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| EngineError::Connection(e.to_string()))?;
            op(&conn)
        })
        .await
        .map_err(|e| EngineError::Connection(format!("blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl AnalyticsEngine for DuckDbEngine {
    async fn list_tables(&self) -> Result<Vec<String>, EngineError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT table_name FROM information_schema.tables \
                     WHERE table_schema = 'main' ORDER BY table_name",
                )
                .map_err(|e| EngineError::Query(e.to_string()))?;
            let tables = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| EngineError::Query(e.to_string()))?
                .filter_map(Result::ok)
                .collect();
            Ok(tables)
        })
        .await
    }

    async fn table_schema(&self, table: &str) -> Result<Vec<(String, String)>, EngineError> {
        let table = table.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT column_name, data_type FROM information_schema.columns \
                     WHERE table_schema = 'main' AND table_name = ? \
                     ORDER BY ordinal_position",
                )
                .map_err(|e| EngineError::Query(e.to_string()))?;
            let columns = stmt
                .query_map([&table], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|e| EngineError::Query(e.to_string()))?
                .filter_map(Result::ok)
                .collect();
            Ok(columns)
        })
        .await
    }

    async fn run_query(&self, sql: &str) -> Result<Vec<Row>, EngineError> {
        let sql = sql.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| EngineError::Query(e.to_string()))?;

            let column_count = stmt.column_count();
            let mut column_names = Vec::with_capacity(column_count);
            for i in 0..column_count {
                match stmt.column_name(i) {
                    Ok(name) => column_names.push(name.to_string()),
                    Err(_) => column_names.push(format!("column_{}", i)),
                }
            }

            let mut rows = stmt
                .query([])
                .map_err(|e| EngineError::Query(e.to_string()))?;

            let mut out: Vec<Row> = Vec::new();
            while let Some(row) = rows
                .next()
                .map_err(|e| EngineError::Query(e.to_string()))?
            {
                let mut record = Map::with_capacity(column_count);
                for (i, name) in column_names.iter().enumerate() {
                    let value = match row.get_ref(i) {
                        Ok(value_ref) => value_ref_to_json(value_ref),
                        Err(_) => Value::Null,
                    };
                    record.insert(name.clone(), value);
                }
                out.push(record);
            }
            Ok(out)
        })
        .await
    }
}

/// Converts a DuckDB cell into JSON. Dates and timestamps become ISO-8601
/// strings so downstream display detection can recognize time series.
fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(n) => Value::from(n),
        ValueRef::SmallInt(n) => Value::from(n),
        ValueRef::Int(n) => Value::from(n),
        ValueRef::BigInt(n) => Value::from(n),
        ValueRef::HugeInt(n) => i64::try_from(n)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(n.to_string())),
        ValueRef::UTinyInt(n) => Value::from(n),
        ValueRef::USmallInt(n) => Value::from(n),
        ValueRef::UInt(n) => Value::from(n),
        ValueRef::UBigInt(n) => Value::from(n),
        ValueRef::Float(n) => Value::from(n as f64),
        ValueRef::Double(n) => Value::from(n),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
        ValueRef::Date32(days) => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
            match epoch.checked_add_signed(Duration::days(days as i64)) {
                Some(date) => Value::String(date.format("%Y-%m-%d").to_string()),
                None => Value::Null,
            }
        }
        ValueRef::Timestamp(unit, raw) => {
            let micros = match unit {
                TimeUnit::Second => raw.saturating_mul(1_000_000),
                TimeUnit::Millisecond => raw.saturating_mul(1_000),
                TimeUnit::Microsecond => raw,
                TimeUnit::Nanosecond => raw / 1_000,
            };
            match DateTime::from_timestamp_micros(micros) {
                Some(ts) => Value::String(ts.format("%Y-%m-%dT%H:%M:%S").to_string()),
                None => Value::Null,
            }
        }
        other => Value::String(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date32_renders_iso_date() {
        // 2024-11-15 is 20042 days after the epoch
        let value = value_ref_to_json(ValueRef::Date32(20042));
        assert_eq!(value, Value::String("2024-11-15".to_string()));
    }

    #[test]
    fn test_timestamp_micros_renders_iso_datetime() {
        let micros = 1_700_000_000_000_000; // 2023-11-14T22:13:20Z
        let value = value_ref_to_json(ValueRef::Timestamp(TimeUnit::Microsecond, micros));
        assert_eq!(value, Value::String("2023-11-14T22:13:20".to_string()));
    }

    #[test]
    fn test_null_and_scalars() {
        assert_eq!(value_ref_to_json(ValueRef::Null), Value::Null);
        assert_eq!(value_ref_to_json(ValueRef::Boolean(true)), Value::Bool(true));
        assert_eq!(value_ref_to_json(ValueRef::BigInt(42)), Value::from(42));
        assert_eq!(value_ref_to_json(ValueRef::Text(b"dc_04")), Value::from("dc_04"));
    }
}
