//! Schema reports built from a finished scan
//!
//! A [`SchemaReport`] pairs the scan counters with one sizing suggestion per
//! field, sorted by name. It renders as the plain-text sizing report, as JSON
//! and as a `CREATE TABLE` statement.

mod ddl;
mod sizing;
mod text;

use std::fs;
use std::path::Path;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::info;

use crate::inference::{
    FieldType, FieldTypeAccumulator, FieldTypeState, InferenceError, SizingConfig,
};
use crate::staging::ScanStatistics;

pub use ddl::{DdlStyle, SURROGATE_KEY, create_table_sql, quote_ident, sequence_name};
pub use sizing::{
    INTEGER_MAX, SMALLINT_MAX, SizingNote, SqlType, Suggestion, float_type, int_type,
    integer_digits, suggest, varchar_size,
};
pub use text::{render_text, size_display};

/// One row of the sizing report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReport {
    pub name: String,
    pub field_type: FieldType,
    pub max_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_val: Option<f64>,
    pub float_precision: usize,
    pub long_text: bool,
    pub suggestion: SqlType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<SizingNote>,
}

impl FieldReport {
    /// Size a single field state
    pub fn from_state(state: &FieldTypeState, config: &SizingConfig) -> Self {
        let Suggestion { sql_type, note } = suggest(state, config);
        Self {
            name: state.name.clone(),
            field_type: state.field_type,
            max_len: state.max_len,
            max_val: state.max_val,
            float_precision: state.float_precision,
            long_text: state.long_text || config.is_long_text(&state.name),
            suggestion: sql_type,
            note,
        }
    }

    /// Suggestion text including its annotation
    pub fn suggestion_text(&self) -> String {
        Suggestion {
            sql_type: self.suggestion,
            note: self.note,
        }
        .to_string()
    }
}

/// Sizing report for a whole corpus
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaReport {
    /// Local time the report was built
    pub generated_at: NaiveDateTime,
    /// Folder, file and record counters of the scan
    pub statistics: ScanStatistics,
    /// One entry per field, sorted by name
    pub fields: Vec<FieldReport>,
}

impl SchemaReport {
    /// Build the report from a finished accumulator
    pub fn build(
        accumulator: &FieldTypeAccumulator,
        statistics: ScanStatistics,
        config: &SizingConfig,
    ) -> Result<Self, InferenceError> {
        if accumulator.is_empty() {
            return Err(InferenceError::NoValidFields);
        }

        let fields = accumulator
            .fields()
            .map(|state| FieldReport::from_state(state, config))
            .collect();

        Ok(Self {
            generated_at: Local::now().naive_local(),
            statistics,
            fields,
        })
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldReport> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Render the plain-text report
    pub fn to_text(&self) -> String {
        render_text(self)
    }

    /// Render the report as pretty JSON
    pub fn to_json(&self) -> Result<String, InferenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `CREATE TABLE` statement for the reported fields
    pub fn to_ddl(&self, table: &str, style: DdlStyle) -> String {
        create_table_sql(self, table, style, &[])
    }

    /// Write the plain-text report, creating parent directories as needed
    pub fn write_text(&self, path: &Path) -> Result<(), InferenceError> {
        write_file(path, &self.to_text())?;
        info!("Sizing report written to {}", path.display());
        Ok(())
    }

    /// Write the JSON report, creating parent directories as needed
    pub fn write_json(&self, path: &Path) -> Result<(), InferenceError> {
        write_file(path, &self.to_json()?)?;
        info!("JSON report written to {}", path.display());
        Ok(())
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), InferenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}
