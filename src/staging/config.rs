//! Configuration for the staging loader

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::StagingError;
use crate::inference::SOURCE_ID_FIELD;

/// Columns whose values are canonicalized to `YYYY-MM-DD` (matched case-insensitively)
pub const DEFAULT_DATE_COLUMNS: &[&str] = &[
    "datadecisao",
    "datadisponibilizacao",
    "dataregistro",
    "dataregistrada",
    "datanascimento",
    "datarequisicao",
    "datapublicacao",
];

/// Input formats tried when canonicalizing a date column
pub const DEFAULT_DATE_FORMATS: &[&str] =
    &["%d/%m/%Y", "%d-%m-%Y", "%Y%m%d", "%Y-%m-%d", "%Y/%m/%d"];

/// Configuration for loading a corpus into the staging table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StagingConfig {
    /// Destination table
    pub table: String,
    /// Rows per INSERT batch
    pub batch_size: usize,
    /// Records missing any of these (or holding null) are dropped
    pub required_fields: Vec<String>,
    /// Columns holding dates, lower-case
    pub date_columns: Vec<String>,
    /// chrono formats tried, in order, on date columns
    pub date_formats: Vec<String>,
    /// Character limit for strings without a specific limit
    pub default_truncation: usize,
    /// Per-column character limits, keyed by lower-case column name
    pub truncation_limits: BTreeMap<String, usize>,
    /// File listing already loaded documents; relative paths resolve against the corpus root
    pub control_log: PathBuf,
    /// When set, batches are upserted on these columns instead of inserted
    pub conflict_keys: Vec<String>,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            table: "judged".to_string(),
            batch_size: 1000,
            required_fields: vec![SOURCE_ID_FIELD.to_string()],
            date_columns: DEFAULT_DATE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
            default_truncation: 255,
            truncation_limits: BTreeMap::from([
                ("numeroprocesso".to_string(), 50),
                ("numeroregistro".to_string(), 50),
                ("datapublicacao".to_string(), 300),
            ]),
            control_log: PathBuf::from("upload_control.log"),
            conflict_keys: Vec::new(),
        }
    }
}

impl StagingConfig {
    /// Create a new builder for StagingConfig
    pub fn builder() -> StagingConfigBuilder {
        StagingConfigBuilder::default()
    }

    /// Character limit for a column
    pub fn truncation_limit(&self, column: &str) -> usize {
        self.truncation_limits
            .get(&column.to_lowercase())
            .copied()
            .unwrap_or(self.default_truncation)
    }

    /// Whether a column holds dates
    pub fn is_date_column(&self, column: &str) -> bool {
        self.date_columns
            .iter()
            .any(|c| c.eq_ignore_ascii_case(column))
    }

    /// Check the settings a load cannot run without
    pub fn validate(&self) -> Result<(), StagingError> {
        if self.table.trim().is_empty() {
            return Err(StagingError::InvalidConfig("table name is empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(StagingError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        if let Some(key) = self
            .conflict_keys
            .iter()
            .find(|k| !self.required_fields.contains(k))
        {
            return Err(StagingError::InvalidConfig(format!(
                "conflict key '{key}' must also be a required field"
            )));
        }
        Ok(())
    }
}

/// Builder for StagingConfig
#[derive(Debug, Default)]
pub struct StagingConfigBuilder {
    table: Option<String>,
    batch_size: Option<usize>,
    required_fields: Option<Vec<String>>,
    date_columns: Option<Vec<String>>,
    default_truncation: Option<usize>,
    truncation_limits: BTreeMap<String, usize>,
    control_log: Option<PathBuf>,
    conflict_keys: Option<Vec<String>>,
}

impl StagingConfigBuilder {
    /// Set the destination table
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Set the batch size for inserts
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Replace the required fields
    pub fn required_fields(mut self, fields: &[&str]) -> Self {
        self.required_fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Replace the date columns
    pub fn date_columns(mut self, columns: &[&str]) -> Self {
        self.date_columns = Some(columns.iter().map(|c| c.to_lowercase()).collect());
        self
    }

    /// Set the default character limit
    pub fn default_truncation(mut self, limit: usize) -> Self {
        self.default_truncation = Some(limit);
        self
    }

    /// Set the character limit for one column
    pub fn truncation_limit(mut self, column: &str, limit: usize) -> Self {
        self.truncation_limits.insert(column.to_lowercase(), limit);
        self
    }

    /// Set the control log path
    pub fn control_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.control_log = Some(path.into());
        self
    }

    /// Upsert on these columns instead of inserting
    pub fn conflict_keys(mut self, keys: &[&str]) -> Self {
        self.conflict_keys = Some(keys.iter().map(|k| k.to_string()).collect());
        self
    }

    /// Build the StagingConfig
    pub fn build(self) -> Result<StagingConfig, StagingError> {
        let defaults = StagingConfig::default();
        let mut truncation_limits = defaults.truncation_limits;
        truncation_limits.extend(self.truncation_limits);

        let config = StagingConfig {
            table: self.table.unwrap_or(defaults.table),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            required_fields: self.required_fields.unwrap_or(defaults.required_fields),
            date_columns: self.date_columns.unwrap_or(defaults.date_columns),
            date_formats: defaults.date_formats,
            default_truncation: self.default_truncation.unwrap_or(defaults.default_truncation),
            truncation_limits,
            control_log: self.control_log.unwrap_or(defaults.control_log),
            conflict_keys: self.conflict_keys.unwrap_or(defaults.conflict_keys),
        };
        config.validate()?;
        Ok(config)
    }
}
