//! CLI error types

use std::path::PathBuf;

use juris_etl::{ConfigError, InferenceError, IngestError, StagingError};
use thiserror::Error;

/// Errors surfaced by CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to write {0}: {1}")]
    FileWriteError(PathBuf, String),
}

impl CliError {
    /// Get a user-friendly error message with hints
    pub fn user_message(&self) -> String {
        match self {
            CliError::Config(e) => e.user_message(),
            CliError::Ingest(e) => e.user_message(),
            CliError::Inference(e) => e.user_message(),
            CliError::Staging(e) => e.user_message(),
            CliError::InvalidArgument(msg) => {
                format!("Invalid argument: {msg}\n\nHint: Run with --help for usage.")
            }
            CliError::FileWriteError(path, error) => format!(
                "Failed to write {}: {error}\n\nHint: Check that the directory is writable.",
                path.display()
            ),
        }
    }
}
