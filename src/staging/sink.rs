//! Destinations for prepared records

use super::error::StagingError;
use crate::inference::{RawValue, Record};
use crate::report::quote_ident;

/// Largest SQL preview written to the log for a failed batch, in bytes
pub const MAX_SQL_LOG_BYTES: usize = 10_240;

/// A table store that accepts batches of records
///
/// Implementations apply a batch atomically: on error nothing from the batch
/// is visible.
pub trait RecordSink {
    /// Insert all rows of a batch
    fn insert_batch(&mut self, table: &str, rows: &[Record]) -> Result<(), StagingError>;

    /// Insert rows, updating existing ones that match on `conflict_keys`
    fn upsert_batch(
        &mut self,
        table: &str,
        conflict_keys: &[&str],
        rows: &[Record],
    ) -> Result<(), StagingError>;
}

/// Column names of a batch: the keys of its first row
pub fn batch_columns(rows: &[Record]) -> Vec<&str> {
    rows.first()
        .map(|row| row.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Whether two records have exactly the same key set
pub fn same_keys(a: &Record, b: &Record) -> bool {
    a.len() == b.len() && a.keys().zip(b.keys()).all(|(x, y)| x == y)
}

/// Render one value as a SQL literal
pub fn render_sql_value(value: &RawValue) -> String {
    match value {
        RawValue::Null => "NULL".to_string(),
        RawValue::Integer(n) => n.to_string(),
        RawValue::Float(f) if f.is_finite() => f.to_string(),
        RawValue::Float(_) => "NULL".to_string(),
        RawValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        RawValue::Text(s) => quote_literal(s),
        RawValue::List(_) | RawValue::Object(_) => quote_literal(&value.to_json().to_string()),
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Render a batch as a multi-row INSERT statement
///
/// Columns come from the first row; a row missing one of them renders `NULL`.
pub fn render_insert_sql(table: &str, rows: &[Record]) -> String {
    let columns = batch_columns(rows);
    if columns.is_empty() {
        return String::new();
    }

    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let values = rows
        .iter()
        .map(|row| {
            let literals = columns
                .iter()
                .map(|c| row.get(*c).map(render_sql_value).unwrap_or_else(|| "NULL".into()))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({literals})")
        })
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "INSERT INTO {} ({column_list})\nVALUES\n{values};",
        quote_ident(table)
    )
}

/// Cut `sql` to at most `max_bytes`, on a character boundary
pub fn truncate_for_log(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Sink that keeps every batch in memory
///
/// Used by the CLI dry run and by tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub batches: Vec<(String, Vec<Record>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows received
    pub fn row_count(&self) -> usize {
        self.batches.iter().map(|(_, rows)| rows.len()).sum()
    }

    /// All rows in arrival order
    pub fn rows(&self) -> impl Iterator<Item = &Record> {
        self.batches.iter().flat_map(|(_, rows)| rows.iter())
    }
}

impl RecordSink for MemorySink {
    fn insert_batch(&mut self, table: &str, rows: &[Record]) -> Result<(), StagingError> {
        self.batches.push((table.to_string(), rows.to_vec()));
        Ok(())
    }

    fn upsert_batch(
        &mut self,
        table: &str,
        conflict_keys: &[&str],
        rows: &[Record],
    ) -> Result<(), StagingError> {
        let same_conflict_keys =
            |a: &Record, b: &Record| conflict_keys.iter().all(|k| a.get(*k) == b.get(*k));

        for row in rows {
            if let Some(stored) = self
                .batches
                .iter_mut()
                .filter(|(t, _)| t.as_str() == table)
                .flat_map(|(_, stored)| stored.iter_mut())
                .find(|stored| same_conflict_keys(stored, row))
            {
                stored.extend(row.clone());
                continue;
            }
            self.batches.push((table.to_string(), vec![row.clone()]));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, RawValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_render_sql_value() {
        assert_eq!(render_sql_value(&RawValue::Null), "NULL");
        assert_eq!(render_sql_value(&RawValue::Integer(-42)), "-42");
        assert_eq!(render_sql_value(&RawValue::Float(2.5)), "2.5");
        assert_eq!(render_sql_value(&RawValue::Boolean(true)), "TRUE");
        assert_eq!(
            render_sql_value(&RawValue::Text("d'Ávila".to_string())),
            "'d''Ávila'"
        );
        assert_eq!(
            render_sql_value(&RawValue::List(vec![
                RawValue::Text("art. 5".to_string()),
                RawValue::Text("o'".to_string()),
            ])),
            r#"'["art. 5","o''"]'"#
        );
    }

    #[test]
    fn test_render_insert_sql() {
        let rows = vec![
            row(&[
                ("id_origem", RawValue::Integer(1)),
                ("relator", RawValue::Text("ANA".to_string())),
            ]),
            row(&[("id_origem", RawValue::Integer(2))]),
        ];

        let sql = render_insert_sql("judged", &rows);
        assert_eq!(
            sql,
            "INSERT INTO \"judged\" (\"id_origem\", \"relator\")\nVALUES\n(1, 'ANA'),\n(2, NULL);"
        );
        assert_eq!(render_insert_sql("judged", &[]), "");
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        assert_eq!(truncate_for_log("abc", 10), "abc");
        assert_eq!(truncate_for_log("abcdef", 3), "abc");
        // 'ç' is two bytes; cutting inside it backs off
        assert_eq!(truncate_for_log("aç", 2), "a");
    }

    #[test]
    fn test_same_keys() {
        let a = row(&[("x", RawValue::Null), ("y", RawValue::Null)]);
        let b = row(&[("y", RawValue::Integer(1)), ("x", RawValue::Integer(2))]);
        let c = row(&[("x", RawValue::Null)]);
        assert!(same_keys(&a, &b));
        assert!(!same_keys(&a, &c));
    }

    #[test]
    fn test_memory_sink_upsert() {
        let mut sink = MemorySink::new();
        sink.insert_batch(
            "judged",
            &[row(&[
                ("id_origem", RawValue::Integer(1)),
                ("relator", RawValue::Text("ANA".to_string())),
            ])],
        )
        .unwrap();

        sink.upsert_batch(
            "judged",
            &["id_origem"],
            &[
                row(&[
                    ("id_origem", RawValue::Integer(1)),
                    ("relator", RawValue::Text("BIA".to_string())),
                ]),
                row(&[("id_origem", RawValue::Integer(2))]),
            ],
        )
        .unwrap();

        assert_eq!(sink.row_count(), 2);
        let first = sink.rows().next().unwrap();
        assert_eq!(first["relator"], RawValue::Text("BIA".to_string()));
    }
}
