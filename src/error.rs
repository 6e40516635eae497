//! Request-level failures
//!
//! Every variant ends the process with exit code 1 before a response is
//! written. Failures inside a language runner never become a `JobError`;
//! they are reported in the response's `error` field instead.

use thiserror::Error;

use crate::common::TimeoutParseError;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Failed to parse input json ({0})")]
    Decode(#[from] serde_json::Error),

    #[error("No files given")]
    NoFiles,

    #[error("Language '{0}' is not supported")]
    UnsupportedLanguage(String),

    #[error("Invalid timeout '{0}'")]
    InvalidTimeout(String),

    #[error("Invalid file name '{0}'")]
    InvalidFileName(String),

    #[error("Failed to write file to disk ({0})")]
    Staging(#[from] std::io::Error),
}

impl From<TimeoutParseError> for JobError {
    fn from(err: TimeoutParseError) -> Self {
        JobError::InvalidTimeout(err.0)
    }
}
