//! Error taxonomy for the report pipeline.
//!
//! Only structural failures live here. Values that fail numeric coercion are
//! data, not errors; see [`crate::cleaning::CoercionFailure`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {message}")]
    Parse { message: String },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("failed to write {}: {message}", path.display())]
    OutputWrite { path: PathBuf, message: String },
}

impl PipelineError {
    pub(crate) fn output(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        PipelineError::OutputWrite {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
