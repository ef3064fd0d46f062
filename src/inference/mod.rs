//! Field-type inference for loosely typed JSON records
//!
//! Every scalar value goes through three steps:
//!
//! - **Normalization** - line breaks, tabs and whitespace runs collapse to one space
//! - **Classification** - integer, then float, then date, then string; nulls,
//!   empty strings and containers are skipped
//! - **Accumulation** - a per-field state promotes along a fixed lattice and
//!   tracks the longest string, largest magnitude and float precision
//!
//! ## Example
//!
//! ```rust
//! use juris_etl::inference::{FieldType, FieldTypeAccumulator, RawValue};
//!
//! let mut acc = FieldTypeAccumulator::default();
//! acc.observe("numeroRegistro", &RawValue::Text("202301234567".into()));
//! acc.observe("numeroRegistro", &RawValue::Text("2023/0123456-7".into()));
//!
//! assert_eq!(acc.get("numeroRegistro").unwrap().field_type, FieldType::String);
//! ```

mod accumulator;
mod classify;
mod config;
mod error;
mod normalize;
mod types;

pub use accumulator::FieldTypeAccumulator;
pub use classify::{DATE_PATTERNS, DatePattern, classify, fraction_digits, parse_date};
pub use config::{DEFAULT_LONG_TEXT_FIELDS, SizingConfig, SizingConfigBuilder};
pub use error::InferenceError;
pub use normalize::{normalize, normalize_text};
pub use types::{
    FieldType, FieldTypeState, RawValue, Record, SOURCE_ID_FIELD, SOURCE_ID_KEY, TypedValue,
    field_name, record_from_json,
};
