//! DuckDB connection wrapper with dataset registration and query execution.
//!
//! The line item store is either an existing DuckDB database file, a directory
//! of parquet snapshots registered as views, or (for tests and tools) an
//! in-memory database created from [`SCHEMA_DDL`](crate::schema::SCHEMA_DDL).

use crate::config;
use crate::error::{AnalyticsError, Result};
use crate::schema::SCHEMA_DDL;
use crate::sql_builder::SqlValue;
use duckdb::{types::ValueRef, Connection as DuckDbConnection};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Wraps a DuckDB connection to the line item store.
///
/// A `Connection` is `Send` but not `Sync`; use [`try_clone`](Self::try_clone)
/// to obtain another connection to the same database for a second thread.
pub struct Connection {
    conn: DuckDbConnection,
    registered_views: RefCell<HashSet<String>>,
}

impl Connection {
    /// Open an empty in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        Ok(Self::wrap(conn))
    }

    /// Open (or create) a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = DuckDbConnection::open(path)?;
        Ok(Self::wrap(conn))
    }

    fn wrap(conn: DuckDbConnection) -> Self {
        Self {
            conn,
            registered_views: RefCell::new(HashSet::new()),
        }
    }

    /// Open another connection to the same database.
    pub fn try_clone(&self) -> Result<Self> {
        let conn = self.conn.try_clone()?;
        Ok(Self {
            conn,
            registered_views: RefCell::new(self.registered_views.borrow().clone()),
        })
    }

    /// Create the store tables if they do not exist yet.
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA_DDL)?;
        let mut views = self.registered_views.borrow_mut();
        for name in config::dataset_files().keys() {
            views.insert(name.to_string());
        }
        Ok(())
    }

    /// Register every known parquet snapshot found in `dir` as a view.
    ///
    /// The line items snapshot is mandatory; lookup tables that are missing
    /// are skipped and only matter to filters that need them.
    pub fn register_dataset(&self, dir: &Path) -> Result<()> {
        let mut files: Vec<(&str, &str)> = config::dataset_files().into_iter().collect();
        files.sort();

        for (view_name, filename) in files {
            let path = dir.join(filename);
            if !path.exists() {
                if view_name == config::LINE_ITEMS_TABLE {
                    return Err(AnalyticsError::NotFound(format!(
                        "line item snapshot {} not found",
                        path.display()
                    )));
                }
                debug!(view = view_name, "snapshot missing, view not registered");
                continue;
            }

            let path_str = sql_path(&path.to_string_lossy());
            self.conn.execute_batch(&format!(
                "CREATE OR REPLACE VIEW {} AS SELECT * FROM read_parquet('{}')",
                view_name, path_str
            ))?;
            self.registered_views.borrow_mut().insert(view_name.to_string());
            info!(view = view_name, path = %path_str, "registered dataset view");
        }

        Ok(())
    }

    /// Append the rows of a newline-delimited JSON file to an existing table,
    /// matching columns by name.
    pub fn load_ndjson(&self, table_name: &str, ndjson_path: &str) -> Result<()> {
        if !self.has_view(table_name) {
            return Err(AnalyticsError::NotFound(format!(
                "unknown table: {}",
                table_name
            )));
        }
        self.conn.execute_batch(&format!(
            "INSERT INTO {} BY NAME SELECT * FROM read_json_auto('{}', format='newline_delimited')",
            table_name,
            sql_path(ndjson_path)
        ))?;
        Ok(())
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// Each row is represented as a `HashMap<String, serde_json::Value>`.
    pub fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        debug!(sql, params = params.len(), "executing query");
        let mut stmt = self.conn.prepare(sql)?;

        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows_result = stmt.query(param_values.as_slice())?;

        // Column metadata is only available once the statement has run.
        let (column_names, column_count) = {
            let executed = rows_result.as_ref().ok_or_else(|| {
                AnalyticsError::NotFound("statement metadata unavailable".to_string())
            })?;
            let names: Vec<String> = executed
                .column_names()
                .into_iter()
                .map(|s| s.to_string())
                .collect();
            (names, executed.column_count())
        };

        let mut out: Vec<HashMap<String, serde_json::Value>> = Vec::new();

        while let Some(row) = rows_result.next()? {
            let mut map = HashMap::with_capacity(column_count);
            for (i, col_name) in column_names.iter().enumerate() {
                map.insert(col_name.clone(), convert_value_ref(row.get_ref(i)?));
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Execute SQL and deserialize each row into type `T`.
    pub fn execute_into<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<T>> {
        let rows = self.execute(sql, params)?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let value = serde_json::Value::Object(row.into_iter().collect());
            results.push(serde_json::from_value(value)?);
        }
        Ok(results)
    }

    /// Execute SQL and return the first column of the first row.
    ///
    /// Returns `None` if the result set is empty.
    pub fn execute_scalar(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<serde_json::Value>> {
        debug!(sql, params = params.len(), "executing scalar query");
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        if let Some(row) = rows.next()? {
            Ok(Some(convert_value_ref(row.get_ref(0)?)))
        } else {
            Ok(None)
        }
    }

    /// Check whether a table or view has been registered.
    pub fn has_view(&self, name: &str) -> bool {
        self.registered_views.borrow().contains(name)
    }

    /// Return a sorted list of all registered table and view names.
    pub fn views(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registered_views.borrow().iter().cloned().collect();
        names.sort();
        names
    }

    /// Access the underlying DuckDB connection for advanced usage.
    pub fn raw(&self) -> &DuckDbConnection {
        &self.conn
    }
}

/// Forward slashes and doubled quotes, for paths embedded in SQL literals.
fn sql_path(path: &str) -> String {
    path.replace('\\', "/").replace('\'', "''")
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UTinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::USmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UBigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            // SUM over BIGINT widens to HUGEINT; fall back to f64 beyond i64.
            if let Ok(i) = i64::try_from(n) {
                serde_json::Value::Number(i.into())
            } else {
                serde_json::Number::from_f64(n as f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).to_string())
        }
        _ => serde_json::Value::Null,
    }
}
