//! Error types for corpus ingestion and staging

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while walking or reading the corpus
#[derive(Error, Debug)]
pub enum IngestError {
    /// Scan root does not exist
    #[error("Directory not found: {0}")]
    RootNotFound(PathBuf),

    /// Scan root is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Root path cannot be turned into a search pattern
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Top-level JSON value is neither an object nor an array
    #[error("Invalid document: {path} - {reason}")]
    InvalidDocument { path: PathBuf, reason: String },

    /// JSON parsing error for a specific file
    #[error("JSON parsing error in {path}: {error}")]
    JsonParse { path: PathBuf, error: String },

    /// File could not be read
    #[error("Could not read {path}: {error}")]
    FileRead { path: PathBuf, error: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while loading records into the staging table
#[derive(Error, Debug)]
pub enum StagingError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// A batch insert failed and was rolled back
    #[error("Batch insert into {table} failed ({rows} rows): {message}")]
    BatchInsert {
        table: String,
        rows: usize,
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Control log could not be read or written
    #[error("Control log error at {path}: {error}")]
    ControlLog { path: PathBuf, error: String },

    /// Corpus walk failed before loading started
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            IngestError::RootNotFound(path) => {
                format!(
                    "Directory not found: {}\n\nHint: Check that the path exists and is spelled correctly.",
                    path.display()
                )
            }
            IngestError::NotADirectory(path) => {
                format!(
                    "Not a directory: {}\n\nHint: Pass the folder that contains the .json documents.",
                    path.display()
                )
            }
            IngestError::InvalidDocument { path, reason } => {
                format!(
                    "Invalid document: {}\nReason: {reason}\n\n\
                    Hint: Each file must hold one JSON object or an array of objects.",
                    path.display()
                )
            }
            IngestError::JsonParse { path, error } => {
                format!(
                    "JSON parse error in {}:\n{error}\n\nHint: Check the JSON syntax of the file.",
                    path.display()
                )
            }
            _ => self.to_string(),
        }
    }
}

impl StagingError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            StagingError::BatchInsert {
                table,
                rows,
                message,
            } => {
                format!(
                    "Batch insert into '{table}' failed; {rows} rows were rolled back.\n{message}\n\n\
                    Hint: The failing batch is logged as SQL at error level. \
                    Files already listed in the control log will be skipped on the next run."
                )
            }
            StagingError::InvalidConfig(msg) => {
                format!("Invalid configuration: {msg}\n\nHint: Check your staging configuration.")
            }
            StagingError::ControlLog { path, error } => {
                format!(
                    "Control log error at {}: {error}\n\nHint: Check that the file is writable.",
                    path.display()
                )
            }
            StagingError::Ingest(e) => e.user_message(),
            _ => self.to_string(),
        }
    }
}

#[cfg(feature = "duckdb-backend")]
impl From<duckdb::Error> for StagingError {
    fn from(err: duckdb::Error) -> Self {
        StagingError::Database(err.to_string())
    }
}
