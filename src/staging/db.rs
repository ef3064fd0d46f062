//! DuckDB staging database

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use super::error::StagingError;
use super::sink::{RecordSink, batch_columns};
use crate::inference::{RawValue, Record};
use crate::report::{DdlStyle, SchemaReport, create_table_sql, quote_ident};

/// Staging table store backed by an embedded DuckDB database
///
/// Every column is stored as text: strings as-is, numbers in their decimal
/// form, lists and objects as JSON.
pub struct DuckDbSink {
    conn: duckdb::Connection,
    path: Option<String>,
    /// Lower-cased column names per lower-cased table name
    columns: HashMap<String, HashSet<String>>,
}

impl DuckDbSink {
    /// Open or create a database at the given path
    pub fn open(path: &str) -> Result<Self, StagingError> {
        let conn = duckdb::Connection::open(path)?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
            columns: HashMap::new(),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn memory() -> Result<Self, StagingError> {
        let conn = duckdb::Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: None,
            columns: HashMap::new(),
        })
    }

    /// Get the database path (if not in-memory)
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Run one or more statements
    pub fn execute_batch(&self, sql: &str) -> Result<(), StagingError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Create the staging table for `report` unless it exists
    ///
    /// With `conflict_keys`, the new table carries a `UNIQUE` constraint on
    /// them. An existing table without one is rejected, since every upsert
    /// into it would fail.
    pub fn ensure_table(
        &mut self,
        report: &SchemaReport,
        table: &str,
        conflict_keys: &[&str],
    ) -> Result<(), StagingError> {
        let ddl = create_table_sql(report, table, DdlStyle::Staging, conflict_keys);
        debug!("Staging DDL:\n{}", ddl);
        self.conn.execute_batch(&ddl)?;
        self.columns.remove(&table.to_lowercase());

        if !conflict_keys.is_empty() && !self.has_unique_constraint(table, conflict_keys)? {
            return Err(StagingError::InvalidConfig(format!(
                "table '{}' has no UNIQUE or PRIMARY KEY constraint on ({}); \
                 upserts need one",
                table,
                conflict_keys.join(", ")
            )));
        }

        info!("Staging table '{}' ready", table);
        Ok(())
    }

    /// Whether `table` has a UNIQUE or PRIMARY KEY constraint on exactly `keys`
    pub fn has_unique_constraint(&self, table: &str, keys: &[&str]) -> Result<bool, StagingError> {
        let mut wanted: Vec<String> = keys.iter().map(|k| k.to_lowercase()).collect();
        wanted.sort();

        let mut stmt = self.conn.prepare(
            "SELECT array_to_string(constraint_column_names, ',') FROM duckdb_constraints() \
             WHERE lower(table_name) = lower(?1) AND constraint_type IN ('UNIQUE', 'PRIMARY KEY')",
        )?;
        let rows = stmt.query_map([table], |row| row.get::<_, String>(0))?;
        for row in rows {
            let mut columns: Vec<String> = row?.split(',').map(str::to_lowercase).collect();
            columns.sort();
            if columns == wanted {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether a table exists
    pub fn table_exists(&self, table: &str) -> Result<bool, StagingError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE lower(table_name) = lower(?1)",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get the row count of a table
    pub fn record_count(&self, table: &str) -> Result<i64, StagingError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Execute a query and return results as JSON
    pub fn query(&self, sql: &str) -> Result<Vec<serde_json::Value>, StagingError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;

        // Get column names after query execution
        let column_count = rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let column_names: Vec<String> = (0..column_count)
            .map(|i| {
                rows.as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        let mut results = Vec::new();

        while let Some(row) = rows.next()? {
            let mut obj = serde_json::Map::new();
            for (i, name) in column_names.iter().enumerate() {
                let value: duckdb::types::Value = row.get(i)?;
                obj.insert(name.clone(), duckdb_to_json(value));
            }
            results.push(serde_json::Value::Object(obj));
        }

        Ok(results)
    }

    /// Known columns of `table`, loaded from the catalog on first use
    fn table_columns(&mut self, table: &str) -> Result<&mut HashSet<String>, StagingError> {
        let key = table.to_lowercase();
        if !self.columns.contains_key(&key) {
            let mut stmt = self.conn.prepare(
                "SELECT column_name FROM information_schema.columns WHERE lower(table_name) = ?1",
            )?;
            let rows = stmt.query_map([key.as_str()], |row| row.get::<_, String>(0))?;
            let mut known = HashSet::new();
            for row in rows {
                known.insert(row?.to_lowercase());
            }
            self.columns.insert(key.clone(), known);
        }
        self.columns
            .get_mut(&key)
            .ok_or_else(|| StagingError::Database(format!("No column cache for {table}")))
    }

    /// Add text columns for batch keys the table does not have yet
    fn add_missing_columns(&mut self, table: &str, columns: &[&str]) -> Result<(), StagingError> {
        let missing: Vec<String> = {
            let known = self.table_columns(table)?;
            columns
                .iter()
                .filter(|c| !known.contains(&c.to_lowercase()))
                .map(|c| c.to_string())
                .collect()
        };

        for column in &missing {
            debug!("Adding column '{}' to '{}'", column, table);
            self.conn.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} VARCHAR",
                quote_ident(table),
                quote_ident(column)
            ))?;
        }

        let known = self.table_columns(table)?;
        known.extend(missing.iter().map(|c| c.to_lowercase()));
        Ok(())
    }

    fn write_batch(
        &mut self,
        table: &str,
        conflict_keys: &[&str],
        rows: &[Record],
    ) -> Result<(), StagingError> {
        let columns = batch_columns(rows);
        if columns.is_empty() {
            return Ok(());
        }
        self.add_missing_columns(table, &columns)?;

        let sql = insert_statement(table, &columns, conflict_keys);
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                let values: Vec<Option<String>> = columns
                    .iter()
                    .map(|c| row.get(*c).and_then(column_text))
                    .collect();
                stmt.execute(duckdb::params_from_iter(values.iter()))?;
            }
        }
        tx.commit()?;

        debug!("Wrote {} rows to '{}'", rows.len(), table);
        Ok(())
    }
}

impl RecordSink for DuckDbSink {
    fn insert_batch(&mut self, table: &str, rows: &[Record]) -> Result<(), StagingError> {
        self.write_batch(table, &[], rows)
    }

    fn upsert_batch(
        &mut self,
        table: &str,
        conflict_keys: &[&str],
        rows: &[Record],
    ) -> Result<(), StagingError> {
        self.write_batch(table, conflict_keys, rows)
    }
}

/// Parameterized INSERT, with an `ON CONFLICT` clause when keys are given
fn insert_statement(table: &str, columns: &[&str], conflict_keys: &[&str]) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
        quote_ident(table)
    );

    if !conflict_keys.is_empty() {
        let target = conflict_keys
            .iter()
            .map(|k| quote_ident(k))
            .collect::<Vec<_>>()
            .join(", ");
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| !conflict_keys.contains(*c))
            .map(|c| format!("{0} = EXCLUDED.{0}", quote_ident(c)))
            .collect();

        if updates.is_empty() {
            sql.push_str(&format!(" ON CONFLICT ({target}) DO NOTHING"));
        } else {
            sql.push_str(&format!(
                " ON CONFLICT ({target}) DO UPDATE SET {}",
                updates.join(", ")
            ));
        }
    }
    sql
}

/// Text stored for a value; `None` is SQL NULL
fn column_text(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Null => None,
        RawValue::Text(s) => Some(s.clone()),
        RawValue::Integer(n) => Some(n.to_string()),
        RawValue::Float(f) => Some(f.to_string()),
        RawValue::Boolean(b) => Some(b.to_string()),
        RawValue::List(_) | RawValue::Object(_) => Some(value.to_json().to_string()),
    }
}

fn duckdb_to_json(value: duckdb::types::Value) -> serde_json::Value {
    use duckdb::types::Value;

    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::TinyInt(n) => serde_json::Value::Number(n.into()),
        Value::SmallInt(n) => serde_json::Value::Number(n.into()),
        Value::Int(n) => serde_json::Value::Number(n.into()),
        Value::BigInt(n) => serde_json::Value::Number(n.into()),
        Value::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s),
        other => serde_json::Value::String(format!("{:?}", other)),
    }
}
