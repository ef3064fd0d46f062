//! Plain-text sizing report

use std::fmt::Write;

use super::{FieldReport, SchemaReport, SqlType};
use crate::inference::FieldType;

const BANNER: &str = "##########################################################";
const DOUBLE_RULE: &str = "==========================================================";
const RULE: &str = "----------------------------------------------------------";

/// Render the report in its fixed-width text layout
pub fn render_text(report: &SchemaReport) -> String {
    let stats = &report.statistics;
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(out, "### FIELD SIZING AND INVENTORY REPORT ###");
    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(
        out,
        "Date/Time: {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "{DOUBLE_RULE}");
    let _ = writeln!(out, "### GENERAL PROCESSING STATISTICS");
    let _ = writeln!(out, "Total Folders Read: {}", stats.folders);
    let _ = writeln!(out, "Total JSON Files Found: {}", stats.files);
    if stats.failed_files > 0 {
        let _ = writeln!(out, "Files Skipped (read or parse errors): {}", stats.failed_files);
    }
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "### DATA INVENTORY ON DISK");
    let _ = writeln!(
        out,
        "TOTAL RECORDS (OBJECTS) AVAILABLE FOR PROCESSING: {} records",
        stats.records
    );
    let _ = writeln!(out, "{DOUBLE_RULE}");
    let _ = writeln!(out, "### FIELD SIZING (SUGGESTED RAW DDL)");
    let _ = writeln!(
        out,
        "{:<30} | {:<10} | {:<20}",
        "ATTRIBUTE (DB)", "DETECTED TYPE", "MAX SIZE/VALUE"
    );
    let _ = writeln!(out, "{RULE}");

    for field in &report.fields {
        let _ = writeln!(
            out,
            "{:<30} | {:<10} | {:<20} (Suggestion: {})",
            field.name,
            type_label(field),
            size_display(field),
            field.suggestion_text()
        );
    }

    let _ = writeln!(out, "{RULE}");
    out
}

fn type_label(field: &FieldReport) -> &'static str {
    if field.suggestion == SqlType::Text {
        FieldType::String.label()
    } else {
        field.field_type.label()
    }
}

/// Contents of the size/value column for a field
pub fn size_display(field: &FieldReport) -> String {
    if field.suggestion == SqlType::Text {
        return field.max_len.to_string();
    }

    match field.field_type {
        FieldType::Date | FieldType::Unknown => "N/A".to_string(),
        FieldType::Float => format!(
            "Abs: {:?} (Precision: {})",
            field.max_val.unwrap_or(0.0),
            field.float_precision
        ),
        FieldType::Int => match field.max_val {
            Some(max_val) => format!("{max_val:.0}"),
            None => "N/A".to_string(),
        },
        FieldType::String if field.max_len == 0 => {
            format!("0 (Default {})", varchar_default(field))
        }
        FieldType::String => field.max_len.to_string(),
    }
}

fn varchar_default(field: &FieldReport) -> usize {
    match field.suggestion {
        SqlType::Varchar(size) => size,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{FieldTypeAccumulator, RawValue, SizingConfig};
    use crate::staging::ScanStatistics;

    fn report_for(acc: &FieldTypeAccumulator) -> SchemaReport {
        let stats = ScanStatistics {
            folders: 4,
            files: 7,
            records: 1234,
            failed_files: 1,
        };
        SchemaReport::build(acc, stats, &SizingConfig::default()).unwrap()
    }

    #[test]
    fn test_header_and_statistics() {
        let text = render_text(&report_for(&FieldTypeAccumulator::default()));

        assert!(text.contains("Total Folders Read: 4"));
        assert!(text.contains("Total JSON Files Found: 7"));
        assert!(text.contains("Files Skipped (read or parse errors): 1"));
        assert!(text.contains("FOR PROCESSING: 1234 records"));
        assert!(text.contains(&format!(
            "{:<30} | DETECTED TYPE | MAX SIZE/VALUE",
            "ATTRIBUTE (DB)"
        )));
    }

    #[test]
    fn test_field_rows() {
        let mut acc = FieldTypeAccumulator::default();
        acc.observe("nome", &RawValue::Text("Maria Silva".into()));
        acc.observe("vazio", &RawValue::Text("".into()));
        acc.observe("vazio", &RawValue::Boolean(true));
        acc.observe("quantidade", &RawValue::Integer(70_000));
        acc.observe("dataDecisao", &RawValue::Text("2024-01-15".into()));
        acc.observe("valor", &RawValue::Float(12.5));

        let text = render_text(&report_for(&acc));
        let row = |name: &str| {
            text.lines()
                .find(|line| line.starts_with(&format!("{name:<30} |")))
                .unwrap()
                .to_string()
        };

        assert_eq!(
            row("nome"),
            format!(
                "{:<30} | {:<10} | {:<20} (Suggestion: VARCHAR(50))",
                "nome", "STRING", "11"
            )
        );
        assert!(row("quantidade").contains("| INT        | 70000"));
        assert!(row("quantidade").ends_with("(Suggestion: INTEGER)"));
        assert!(row("dataDecisao").contains("| DATE       | N/A"));
        assert!(row("valor").contains("Abs: 12.5 (Precision: 1)"));
        assert!(row("ementa").ends_with("(Suggestion: TEXT (predefined long text))"));
        assert!(row("vazio").contains("| STRING     | 4"));
    }

    #[test]
    fn test_unknown_row() {
        let mut acc = FieldTypeAccumulator::default();
        acc.observe("observacao", &RawValue::Null);

        let text = render_text(&report_for(&acc));
        assert!(text.contains("| UNKNOWN    | N/A"));
        assert!(text.contains("(Suggestion: VARCHAR(50) (no sample))"));
    }
}
