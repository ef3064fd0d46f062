//! Error types for schema inference

use thiserror::Error;

/// Errors that can occur while building a schema report
#[derive(Error, Debug, Clone)]
pub enum InferenceError {
    /// The scan produced no field states
    #[error("No valid fields found to report")]
    NoValidFields,

    /// IO error while writing a report
    #[error("IO error: {0}")]
    Io(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(String),
}

impl InferenceError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            InferenceError::NoValidFields => "No valid fields found to report.\n\n\
                Hint: Check that the directory contains .json documents with object records."
                .to_string(),
            InferenceError::Io(msg) => {
                format!("Could not write report: {msg}\n\nHint: Check the output path permissions.")
            }
            _ => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for InferenceError {
    fn from(e: serde_json::Error) -> Self {
        InferenceError::Json(e.to_string())
    }
}

impl From<std::io::Error> for InferenceError {
    fn from(e: std::io::Error) -> Self {
        InferenceError::Io(e.to_string())
    }
}
