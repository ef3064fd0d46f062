//! `CREATE TABLE` generation from a sizing report

use super::{SchemaReport, SqlType};

/// Surrogate key column added to every generated table
pub const SURROGATE_KEY: &str = "id_dw";

/// Which kind of table to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlStyle {
    /// Suggested types, PostgreSQL flavoured, `BIGSERIAL` key
    Warehouse,
    /// Raw landing table: TEXT for long text, VARCHAR for everything else,
    /// sequence-backed key that DuckDB and PostgreSQL both accept
    Staging,
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Name of the sequence backing a staging table's surrogate key
pub fn sequence_name(table: &str) -> String {
    format!("{table}_{SURROGATE_KEY}_seq")
}

/// Build the DDL for `table` from the report's fields
///
/// `unique_keys` become a `UNIQUE` table constraint, which `ON CONFLICT`
/// upserts need. Keys the report never saw are added as plain columns.
pub fn create_table_sql(
    report: &SchemaReport,
    table: &str,
    style: DdlStyle,
    unique_keys: &[&str],
) -> String {
    let mut columns = Vec::with_capacity(report.fields.len() + 1);
    let mut sql = String::new();

    match style {
        DdlStyle::Warehouse => {
            columns.push(format!("    {SURROGATE_KEY} BIGSERIAL PRIMARY KEY"));
        }
        DdlStyle::Staging => {
            let sequence = sequence_name(table);
            sql.push_str(&format!(
                "CREATE SEQUENCE IF NOT EXISTS {};\n",
                quote_ident(&sequence)
            ));
            columns.push(format!(
                "    {SURROGATE_KEY} BIGINT PRIMARY KEY DEFAULT nextval('{sequence}')"
            ));
        }
    }

    for field in report.fields.iter().filter(|f| f.name != SURROGATE_KEY) {
        let column_type = match style {
            DdlStyle::Warehouse => field.suggestion.column_type(),
            DdlStyle::Staging if field.suggestion == SqlType::Text => "TEXT".to_string(),
            DdlStyle::Staging => "VARCHAR".to_string(),
        };
        columns.push(format!("    {} {}", quote_ident(&field.name), column_type));
    }

    if !unique_keys.is_empty() {
        for key in unique_keys.iter().filter(|k| report.field(k).is_none()) {
            let column_type = match style {
                DdlStyle::Warehouse => SqlType::Varchar(50).column_type(),
                DdlStyle::Staging => "VARCHAR".to_string(),
            };
            columns.push(format!("    {} {}", quote_ident(key), column_type));
        }
        let key_list = unique_keys
            .iter()
            .map(|k| quote_ident(k))
            .collect::<Vec<_>>()
            .join(", ");
        columns.push(format!("    UNIQUE ({key_list})"));
    }

    let if_not_exists = match style {
        DdlStyle::Warehouse => "",
        DdlStyle::Staging => "IF NOT EXISTS ",
    };
    sql.push_str(&format!(
        "CREATE TABLE {if_not_exists}{} (\n{}\n);\n",
        quote_ident(table),
        columns.join(",\n")
    ));
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{FieldTypeAccumulator, RawValue, SizingConfig};
    use crate::staging::ScanStatistics;

    fn report() -> SchemaReport {
        let mut acc = FieldTypeAccumulator::with_long_text(["ementa"]);
        acc.observe("numeroRegistro", &RawValue::Integer(202_301_234_567));
        acc.observe("dataDecisao", &RawValue::Text("2023-04-11".into()));
        acc.observe("siglaClasse", &RawValue::Text("REsp".into()));
        SchemaReport::build(&acc, ScanStatistics::default(), &SizingConfig::default()).unwrap()
    }

    #[test]
    fn test_warehouse_ddl() {
        let sql = create_table_sql(&report(), "judged", DdlStyle::Warehouse, &[]);
        assert!(sql.starts_with("CREATE TABLE \"judged\" (\n"));
        assert!(sql.contains("    id_dw BIGSERIAL PRIMARY KEY,\n"));
        assert!(sql.contains("    \"dataDecisao\" DATE,\n"));
        assert!(sql.contains("    \"ementa\" TEXT,\n"));
        assert!(sql.contains("    \"numeroRegistro\" BIGINT,\n"));
        assert!(sql.contains("    \"siglaClasse\" VARCHAR(50)\n);"));
    }

    #[test]
    fn test_staging_ddl() {
        let sql = create_table_sql(&report(), "judged", DdlStyle::Staging, &[]);
        assert!(sql.starts_with("CREATE SEQUENCE IF NOT EXISTS \"judged_id_dw_seq\";\n"));
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"judged\" ("));
        assert!(sql.contains("id_dw BIGINT PRIMARY KEY DEFAULT nextval('judged_id_dw_seq')"));
        assert!(sql.contains("    \"dataDecisao\" VARCHAR,\n"));
        assert!(sql.contains("    \"ementa\" TEXT,\n"));
    }

    #[test]
    fn test_unique_keys_constraint() {
        let sql = create_table_sql(
            &report(),
            "judged",
            DdlStyle::Staging,
            &["numeroRegistro", "id_origem"],
        );
        // id_origem is not in the report, so it gets its own column
        assert!(sql.contains("    \"id_origem\" VARCHAR,\n"));
        assert!(sql.contains("    UNIQUE (\"numeroRegistro\", \"id_origem\")\n);"));
        assert_eq!(sql.matches("\"numeroRegistro\" VARCHAR").count(), 1);

        let warehouse = create_table_sql(&report(), "judged", DdlStyle::Warehouse, &["id_origem"]);
        assert!(warehouse.contains("    \"id_origem\" VARCHAR(50),\n"));
        assert!(warehouse.contains("    UNIQUE (\"id_origem\")\n);"));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("nome"), "\"nome\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
