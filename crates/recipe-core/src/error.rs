//! Error types for the recipe pipeline.
//!
//! Unit-level failures (one page, one frame, one line) are represented here so
//! they can be logged with a consistent shape, but they never abort a document.
//! Only the variants returned from [`crate::pipeline::Importer::import`] reach
//! the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Problems with the document handed to the pipeline.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("unsupported file extension: {0:?}")]
    UnsupportedExtension(String),

    #[error("failed to read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("text file is not valid UTF-8: {0}")]
    InvalidText(PathBuf),

    #[error("failed to read video {path}: {message}")]
    UnreadableVideo { path: PathBuf, message: String },
}

/// Failure to build a recipe from classified lines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("a recipe needs an image but none was available")]
    MissingImage,
}

/// Failures of recipe store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("category name must not be empty")]
    EmptyCategoryName,

    #[error("category already exists: {0}")]
    CategoryExists(String),

    #[error("category not found: {0}")]
    CategoryNotFound(String),

    #[error("no recipe at index {index} in category {category}")]
    RecipeNotFound { category: String, index: usize },

    #[error("recipe store is closed")]
    Closed,
}

/// Top-level pipeline error.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("OCR failed on {unit}: {message}")]
    Ocr { unit: String, message: String },

    #[error("classification failed for line {index}: {message}")]
    Classification { index: usize, message: String },

    #[error("classification backend unavailable")]
    BackendUnavailable,

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("could not recognize any ingredients or instructions")]
    NothingRecognized,

    #[error("import cancelled")]
    Cancelled,
}

pub type PipelineResult<T> = Result<T, PipelineError>;
