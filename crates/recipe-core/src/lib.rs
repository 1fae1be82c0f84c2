//! Recipe Core - recipe extraction from scanned and typed documents
//!
//! This crate contains the pipeline that turns a recipe document into a
//! structured recipe:
//! - Document loading (images, PDFs via MuPDF, text files, videos)
//! - OCR through a pluggable recognizer (Tesseract)
//! - Line labelling with keyword heuristics or a classification backend
//!   (HTTP service or local model)
//! - Recipe assembly and the category-keyed recipe store

pub mod assemble;
pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod segment;
pub mod store;
pub mod types;
pub mod video;

use std::sync::Arc;

pub use classify::{BatchClassifier, LabelBackend};
pub use config::{BackendConfig, Config, Settings};
pub use document::{load_document, load_image, RawDocument};
pub use error::{AssemblyError, InputError, PipelineError, PipelineResult, StoreError};
pub use ocr::{PageAggregator, TextRecognizer};
pub use pipeline::{ImportRequest, Importer};
pub use store::{Recipe, RecipeStore, StoreHandle};
pub use types::{ClassifiedLine, Label};
pub use video::{FrameSampler, VideoDecoder};

/// Application state shared by front ends
pub struct AppState {
    pub config: Config,
    pub settings: Settings,
    /// Session recipe store
    pub store: StoreHandle,
}

impl AppState {
    /// Create the data directory, load settings and start the recipe store.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.ensure_dirs()?;
        let settings = Settings::load(&config.settings_file);

        tracing::info!(
            backend = settings.backend.backend_type(),
            data_dir = %config.data_dir.display(),
            "Recipe core ready"
        );

        Ok(Self {
            config,
            settings,
            store: StoreHandle::spawn(RecipeStore::new()),
        })
    }

    /// Build an importer wired to the configured classification backend.
    pub fn importer(
        &self,
        recognizer: Arc<dyn TextRecognizer>,
        decoder: Option<Arc<dyn VideoDecoder>>,
    ) -> Importer {
        let mut importer = Importer::new(recognizer, self.store.clone(), self.settings.clone());

        if let Some(backend) = classify::backend::from_config(&self.settings.backend) {
            tracing::info!(backend = backend.backend_name(), "Using classification backend");
            importer = importer.with_classifier(BatchClassifier::from_settings(backend, &self.settings));
        }
        if let Some(decoder) = decoder {
            importer = importer.with_video_decoder(decoder);
        }
        importer
    }
}
