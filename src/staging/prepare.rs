//! Record cleanup before insertion into the staging table

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::config::StagingConfig;
use crate::inference::{RawValue, Record, SOURCE_ID_FIELD, SizingConfig, normalize_text};

/// Source keys stored as the origin id, compared case-insensitively
const SOURCE_ID_ALIASES: &[&str] = &["id", "id_registro"];

/// Marker some sources put in front of a date
const DATE_MARKER: &str = "DATA:";

/// Applies key renames, normalization, date canonicalization and truncation
#[derive(Debug, Clone)]
pub struct RecordPreparer {
    config: StagingConfig,
    long_text: HashSet<String>,
}

impl RecordPreparer {
    pub fn new(staging: &StagingConfig, sizing: &SizingConfig) -> Self {
        Self {
            config: staging.clone(),
            long_text: sizing.long_text_fields.iter().cloned().collect(),
        }
    }

    /// Clean a record; `None` when a required field is missing or null
    pub fn prepare(&self, record: Record) -> Option<Record> {
        let mut prepared = Record::new();

        for (key, value) in record {
            let key = if is_source_id(&key) {
                SOURCE_ID_FIELD.to_string()
            } else {
                key
            };
            let value = self.prepare_value(&key, value);
            prepared.insert(key, value);
        }

        for field in &self.config.required_fields {
            if matches!(prepared.get(field), None | Some(RawValue::Null)) {
                warn!("Record dropped: required field '{field}' missing or null");
                return None;
            }
        }

        Some(prepared)
    }

    fn prepare_value(&self, key: &str, value: RawValue) -> RawValue {
        let value = if self.config.is_date_column(key) {
            self.canonical_date_value(value)
        } else {
            normalize_value(value)
        };

        match value {
            RawValue::Text(text) if !self.long_text.contains(key) => {
                RawValue::Text(self.truncate(key, text))
            }
            other => other,
        }
    }

    fn canonical_date_value(&self, value: RawValue) -> RawValue {
        match value {
            RawValue::Text(text) => RawValue::Text(self.canonical_date(&text)),
            RawValue::Integer(n) => RawValue::Text(self.canonical_date(&n.to_string())),
            RawValue::Float(f) => RawValue::Text(self.canonical_date(&f.to_string())),
            other => normalize_value(other),
        }
    }

    /// Rewrite a date as `YYYY-MM-DD`, or return the trimmed input when no format matches
    pub fn canonical_date(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return String::new();
        }

        let candidate = strip_date_marker(raw).unwrap_or(raw);
        self.config
            .date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| raw.to_string())
    }

    fn truncate(&self, key: &str, text: String) -> String {
        let limit = self.config.truncation_limit(key);
        let len = text.chars().count();
        if len <= limit {
            return text;
        }
        debug!("Column '{key}' truncated from {len} to {limit} characters");
        text.chars().take(limit).collect()
    }
}

fn is_source_id(key: &str) -> bool {
    SOURCE_ID_ALIASES
        .iter()
        .any(|alias| key.eq_ignore_ascii_case(alias))
}

/// Normalize strings and lists made only of strings
fn normalize_value(value: RawValue) -> RawValue {
    match value {
        RawValue::Text(text) => RawValue::Text(normalize_text(&text)),
        RawValue::List(items) if items.iter().all(|i| matches!(i, RawValue::Text(_))) => {
            RawValue::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        RawValue::Text(text) => RawValue::Text(normalize_text(&text)),
                        other => other,
                    })
                    .collect(),
            )
        }
        other => other,
    }
}

/// The first token after a `DATA:` marker, matched case-insensitively
fn strip_date_marker(raw: &str) -> Option<&str> {
    let start = raw.to_ascii_uppercase().find(DATE_MARKER)? + DATE_MARKER.len();
    raw.get(start..)?.split_whitespace().next()
}
