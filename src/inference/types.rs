//! Value model and per-field type state

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key that collides with the warehouse surrogate key
pub const SOURCE_ID_KEY: &str = "id";

/// Name the source `id` key is stored under
pub const SOURCE_ID_FIELD: &str = "id_origem";

/// A JSON value decoded once at ingestion
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    List(Vec<RawValue>),
    Object(Record),
}

/// One corpus record: field name to value, with the `id` rename applied
pub type Record = BTreeMap<String, RawValue>;

impl RawValue {
    /// Whether this value is a nested container
    pub fn is_container(&self) -> bool {
        matches!(self, RawValue::List(_) | RawValue::Object(_))
    }

    /// Convert back to a `serde_json::Value`
    pub fn to_json(&self) -> Value {
        match self {
            RawValue::Null => Value::Null,
            RawValue::Integer(n) => Value::from(*n),
            RawValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            RawValue::Text(s) => Value::String(s.clone()),
            RawValue::Boolean(b) => Value::Bool(*b),
            RawValue::List(items) => Value::Array(items.iter().map(RawValue::to_json).collect()),
            RawValue::Object(record) => Value::Object(
                record
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Integer(i),
                // u64 above i64::MAX and real numbers both land here
                None => RawValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => RawValue::Text(s),
            Value::Array(items) => RawValue::List(items.into_iter().map(RawValue::from).collect()),
            Value::Object(map) => RawValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, RawValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Map a source key to its stored field name
pub fn field_name(key: &str) -> &str {
    if key == SOURCE_ID_KEY {
        SOURCE_ID_FIELD
    } else {
        key
    }
}

/// Build a record from a decoded JSON object, renaming `id` to `id_origem`
pub fn record_from_json(map: serde_json::Map<String, Value>) -> Record {
    map.into_iter()
        .map(|(k, v)| (field_name(&k).to_string(), RawValue::from(v)))
        .collect()
}

/// Detected SQL-oriented type of a field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Unknown,
    String,
    Int,
    Float,
    Date,
}

impl FieldType {
    /// Upper-case label used in the text report
    pub fn label(&self) -> &'static str {
        match self {
            FieldType::Unknown => "UNKNOWN",
            FieldType::String => "STRING",
            FieldType::Int => "INT",
            FieldType::Float => "FLOAT",
            FieldType::Date => "DATE",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Unknown => write!(f, "unknown"),
            FieldType::String => write!(f, "string"),
            FieldType::Int => write!(f, "int"),
            FieldType::Float => write!(f, "float"),
            FieldType::Date => write!(f, "date"),
        }
    }
}

/// A classified scalar: the typed value together with its type tag
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Integer(i128),
    /// A real number and its count of fractional digits
    Float { value: f64, fraction_digits: usize },
    Date(NaiveDateTime),
    Text(String),
}

impl TypedValue {
    /// The type tag of this value
    pub fn field_type(&self) -> FieldType {
        match self {
            TypedValue::Integer(_) => FieldType::Int,
            TypedValue::Float { .. } => FieldType::Float,
            TypedValue::Date(_) => FieldType::Date,
            TypedValue::Text(_) => FieldType::String,
        }
    }
}

/// Inferred type state for one field across a corpus scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTypeState {
    /// Field name (after the `id` rename)
    pub name: String,
    /// Current detected type
    pub field_type: FieldType,
    /// Longest normalized string length in characters
    pub max_len: usize,
    /// Largest absolute numeric magnitude; `None` until a numeric sample arrives
    pub max_val: Option<f64>,
    /// Largest count of fractional digits seen on a float
    pub float_precision: usize,
    /// Field belongs to the long-text set and is pinned to `string`
    pub long_text: bool,
    /// Longest string-tagged sample seen in any state
    #[serde(skip)]
    pub(crate) longest_text: usize,
}

impl FieldTypeState {
    /// A field seen for the first time, with no sample yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Unknown,
            max_len: 0,
            max_val: None,
            float_precision: 0,
            long_text: false,
            longest_text: 0,
        }
    }

    /// A field from the long-text set
    pub fn long_text(name: impl Into<String>) -> Self {
        Self {
            field_type: FieldType::String,
            long_text: true,
            ..Self::new(name)
        }
    }

    pub(crate) fn track_magnitude(&mut self, magnitude: f64) {
        self.max_val = Some(match self.max_val {
            Some(current) => current.max(magnitude),
            None => magnitude,
        });
    }
}
