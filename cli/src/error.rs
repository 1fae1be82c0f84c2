//! Command error types for machine-readable CLI output
//!
//! Provides structured errors that serialize to `{"code": "...", "message": "..."}`.

use recipe_core::{AssemblyError, InputError, PipelineError};
use serde::Serialize;

/// Errors reported per input file
///
/// Each variant serializes with a snake_case `code` field for scripting.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum CommandError {
    // Input errors
    UnsupportedFile { message: String },
    InvalidInput { message: String },

    // Recognition errors
    NothingRecognized { message: String },
    MissingImage { message: String },

    // Operation errors
    Cancelled { message: String },
    StorageError { message: String },
    InternalError { message: String },
}

impl CommandError {
    pub fn message(&self) -> &str {
        match self {
            Self::UnsupportedFile { message }
            | Self::InvalidInput { message }
            | Self::NothingRecognized { message }
            | Self::MissingImage { message }
            | Self::Cancelled { message }
            | Self::StorageError { message }
            | Self::InternalError { message } => message,
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for CommandError {}

impl From<PipelineError> for CommandError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err {
            PipelineError::Input(InputError::UnsupportedExtension(_)) => {
                Self::UnsupportedFile { message }
            }
            PipelineError::Input(_) => Self::InvalidInput { message },
            PipelineError::NothingRecognized => Self::NothingRecognized { message },
            PipelineError::Assembly(AssemblyError::MissingImage) => Self::MissingImage {
                message: format!("{} (pass --cover for text files)", message),
            },
            PipelineError::Cancelled => Self::Cancelled { message },
            PipelineError::Store(_) => Self::StorageError { message },
            PipelineError::Ocr { .. }
            | PipelineError::Classification { .. }
            | PipelineError::BackendUnavailable => Self::InternalError { message },
        }
    }
}
