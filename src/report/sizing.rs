//! DDL sizing rules for a single field

use std::fmt;

use serde::{Serialize, Serializer};

use crate::inference::{FieldType, FieldTypeState, SizingConfig};

/// Largest value a SMALLINT column holds
pub const SMALLINT_MAX: f64 = 32_767.0;

/// Largest value an INTEGER column holds
pub const INTEGER_MAX: f64 = 2_147_483_647.0;

/// Suggested column type for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    DateOrTimestamp,
    Numeric { precision: usize, scale: usize },
    DoublePrecision,
    SmallInt,
    Integer,
    BigInt,
    Varchar(usize),
}

impl SqlType {
    /// Column type used in a generated `CREATE TABLE`
    pub fn column_type(&self) -> String {
        match self {
            SqlType::DateOrTimestamp => "DATE".to_string(),
            SqlType::DoublePrecision => "FLOAT8".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Text => write!(f, "TEXT"),
            SqlType::DateOrTimestamp => write!(f, "DATE or TIMESTAMP"),
            SqlType::Numeric { precision, scale } => write!(f, "NUMERIC({precision}, {scale})"),
            SqlType::DoublePrecision => write!(f, "FLOAT8 (or REAL/DOUBLE PRECISION)"),
            SqlType::SmallInt => write!(f, "SMALLINT"),
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::BigInt => write!(f, "BIGINT"),
            SqlType::Varchar(size) => write!(f, "VARCHAR({size})"),
        }
    }
}

impl Serialize for SqlType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Annotation attached to a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SizingNote {
    /// Field is in the long-text set
    PredefinedLongText,
    /// Numeric field without a usable magnitude
    NoValidSample,
    /// Field seen but every value was skipped
    NoSample,
}

impl SizingNote {
    pub fn label(&self) -> &'static str {
        match self {
            SizingNote::PredefinedLongText => "predefined long text",
            SizingNote::NoValidSample => "no valid sample",
            SizingNote::NoSample => "no sample",
        }
    }
}

/// The sizing decision for one field
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub sql_type: SqlType,
    pub note: Option<SizingNote>,
}

impl Suggestion {
    fn plain(sql_type: SqlType) -> Self {
        Self {
            sql_type,
            note: None,
        }
    }

    fn noted(sql_type: SqlType, note: SizingNote) -> Self {
        Self {
            sql_type,
            note: Some(note),
        }
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.note {
            Some(note) => write!(f, "{} ({})", self.sql_type, note.label()),
            None => write!(f, "{}", self.sql_type),
        }
    }
}

/// Pick a column type for a field's final state
pub fn suggest(state: &FieldTypeState, config: &SizingConfig) -> Suggestion {
    if state.long_text || config.is_long_text(&state.name) {
        return Suggestion::noted(SqlType::Text, SizingNote::PredefinedLongText);
    }

    match state.field_type {
        FieldType::String if state.max_len > config.text_threshold => {
            Suggestion::plain(SqlType::Text)
        }
        FieldType::Date => Suggestion::plain(SqlType::DateOrTimestamp),
        FieldType::Float => Suggestion::plain(float_type(
            state.max_val.unwrap_or(0.0),
            state.float_precision,
            config,
        )),
        FieldType::Int => match state.max_val {
            Some(max_val) => Suggestion::plain(int_type(max_val)),
            None => Suggestion::noted(SqlType::Integer, SizingNote::NoValidSample),
        },
        FieldType::String => Suggestion::plain(SqlType::Varchar(varchar_size(
            state.max_len,
            config,
        ))),
        FieldType::Unknown => Suggestion::noted(
            SqlType::Varchar(config.default_varchar),
            SizingNote::NoSample,
        ),
    }
}

/// Smallest integer column that holds `max_val`
pub fn int_type(max_val: f64) -> SqlType {
    if max_val <= SMALLINT_MAX {
        SqlType::SmallInt
    } else if max_val <= INTEGER_MAX {
        SqlType::Integer
    } else {
        SqlType::BigInt
    }
}

/// Double precision, or NUMERIC once digits or scale outgrow it
pub fn float_type(max_val: f64, precision: usize, config: &SizingConfig) -> SqlType {
    let total_digits = integer_digits(max_val) + precision;
    if total_digits > config.max_float_digits || precision > config.max_float_scale {
        SqlType::Numeric {
            precision: total_digits + 2,
            scale: precision,
        }
    } else {
        SqlType::DoublePrecision
    }
}

/// Number of digits in the integer part of a magnitude
pub fn integer_digits(magnitude: f64) -> usize {
    format!("{:.0}", magnitude.abs().floor()).len()
}

/// VARCHAR size with the safety margin applied and rounded up
///
/// Below 100 the size rounds to tens with a floor of the default size, below
/// 500 to fifties, and above that to hundreds.
pub fn varchar_size(max_len: usize, config: &SizingConfig) -> usize {
    if max_len == 0 {
        return config.default_varchar;
    }

    let base = max_len as f64 * config.safety_margin;
    if base < 100.0 {
        round_up(base, 10).max(config.default_varchar)
    } else if base < 500.0 {
        round_up(base, 50)
    } else {
        round_up(base, 100)
    }
}

fn round_up(value: f64, step: usize) -> usize {
    (value / step as f64).ceil() as usize * step
}
