//! Juris ETL - schema sizing and staging for scraped legal-judgment corpora
//!
//! Provides:
//! - Field-type inference over loosely typed JSON records
//! - Sizing reports with suggested SQL types (text, JSON and DDL)
//! - A corpus walker and a batch loader into a staging table
//! - TOML run configuration

pub mod config;
pub mod inference;
pub mod report;
pub mod staging;

// Re-export commonly used types
pub use config::{ConfigError, EtlConfig};
pub use inference::{
    FieldType, FieldTypeAccumulator, FieldTypeState, InferenceError, RawValue, Record,
    SizingConfig,
};
pub use report::{DdlStyle, FieldReport, SchemaReport, SqlType};
#[cfg(feature = "duckdb-backend")]
pub use staging::DuckDbSink;
pub use staging::{
    IngestError, LoadStats, RecordSink, ScanStatistics, StagingConfig, StagingError,
    load_corpus, scan_corpus, scan_roots,
};
