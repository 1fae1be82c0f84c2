//! Line classification backend abstraction
//!
//! This module provides a unified interface for the backends that label a
//! single line of recipe text:
//! - Remote HTTP classification service
//! - Local in-process sequence classification model

pub mod local;
pub mod remote;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::BackendConfig;
use crate::types::Label;

pub use local::{HubTokenizer, LineEncoder, LocalBackend, SequenceModel};
pub use remote::RemoteBackend;

/// Unified line classification interface
#[async_trait]
pub trait LabelBackend: Send + Sync {
    /// Label one line. Errors are per-line failures; the batch carries on.
    async fn classify_one(&self, line: &str) -> Result<Label>;

    /// Get the backend name (e.g., "remote", "local")
    fn backend_name(&self) -> &'static str;
}

/// Build the backend described by `config`.
///
/// Returns `None` for [`BackendConfig::Heuristic`], which needs no backend.
/// [`LocalBackend`] needs an embedder-supplied model and is never built here.
pub fn from_config(config: &BackendConfig) -> Option<Arc<dyn LabelBackend>> {
    match config {
        BackendConfig::Heuristic => None,
        BackendConfig::Remote { endpoint } => Some(Arc::new(RemoteBackend::new(endpoint))),
    }
}
