//! Corpus walking and the staging loader
//!
//! The walker ([`scan_corpus`], [`scan_roots`]) feeds the inference engine.
//! The loader ([`load_corpus`]) cleans each record with a [`RecordPreparer`]
//! and writes key-consistent batches to a [`RecordSink`], remembering finished
//! documents in a [`ControlLog`] so reruns pick up where they stopped.
//!
//! With the `duckdb-backend` feature, [`DuckDbSink`] stores the rows in an
//! embedded DuckDB database.

mod config;
#[cfg(feature = "duckdb-backend")]
mod db;
mod error;
mod ingest;
mod loader;
mod prepare;
mod progress;
mod sink;

pub use config::{DEFAULT_DATE_COLUMNS, DEFAULT_DATE_FORMATS, StagingConfig, StagingConfigBuilder};
#[cfg(feature = "duckdb-backend")]
pub use db::DuckDbSink;
pub use error::{IngestError, StagingError};
pub use ingest::{
    CorpusScan, Discovery, ScanStatistics, check_root, discover_files, read_document, scan_corpus,
    scan_roots,
};
pub use loader::{ControlLog, LoadStats, load_corpus, relative_path};
pub use prepare::RecordPreparer;
pub use progress::{LoadProgress, ScanProgress, format_number};
pub use sink::{
    MAX_SQL_LOG_BYTES, MemorySink, RecordSink, batch_columns, render_insert_sql, render_sql_value,
    same_keys, truncate_for_log,
};
