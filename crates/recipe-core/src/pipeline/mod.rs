//! Document import pipeline.
//!
//! # Architecture
//!
//! ```text
//!  Image        Pdf            TextFile       Video
//!    │           │                │             │
//!    │           ▼                │             ▼
//!    │     PageAggregator         │       FrameSampler
//!    │     (OCR per page,         │             │
//!    │      joined in order)      │             ▼
//!    ▼           │                │       OCR per frame
//!   OCR          │                │             │
//!    │           │                │             │ (one batch per frame)
//!    └───────────┴───────┬────────┴─────────────┘
//!                        ▼
//!                 BatchClassifier ──(empty)──► LineSegmenter
//!                        │
//!                        ▼
//!                 RecipeAssembler ──► StoreHandle
//! ```
//!
//! A PDF becomes one recipe. A video becomes one recipe per sampled frame
//! that yields any ingredient or instruction.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use tokio_util::sync::CancellationToken;

use crate::assemble;
use crate::classify::BatchClassifier;
use crate::config::Settings;
use crate::document::{self, RawDocument};
use crate::error::{InputError, PipelineError};
use crate::ocr::{self, PageAggregator, TextRecognizer};
use crate::segment;
use crate::store::{Recipe, StoreHandle};
use crate::types::{text_lines, ClassifiedLine, Label};
use crate::video::{FrameSampler, VideoDecoder};

/// One document to import.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub document: RawDocument,
    /// Target category; the configured default when `None`
    pub category: Option<String>,
    /// Image to attach to recipes from plain-text files
    pub cover: Option<DynamicImage>,
}

impl ImportRequest {
    pub fn new(document: RawDocument) -> Self {
        Self {
            document,
            category: None,
            cover: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_cover(mut self, cover: DynamicImage) -> Self {
        self.cover = Some(cover);
        self
    }
}

/// Labelled lines and the image they will be saved with.
struct Candidate {
    lines: Vec<ClassifiedLine>,
    image: Option<Arc<DynamicImage>>,
}

/// Runs documents through OCR, classification and assembly into the store.
pub struct Importer {
    recognizer: Arc<dyn TextRecognizer>,
    aggregator: PageAggregator,
    classifier: Option<BatchClassifier>,
    sampler: Option<FrameSampler>,
    store: StoreHandle,
    settings: Settings,
}

impl Importer {
    /// Create an importer that labels lines with the keyword heuristics.
    pub fn new(recognizer: Arc<dyn TextRecognizer>, store: StoreHandle, settings: Settings) -> Self {
        let aggregator =
            PageAggregator::new(recognizer.clone()).with_max_concurrent(settings.max_concurrent_ocr);
        Self {
            recognizer,
            aggregator,
            classifier: None,
            sampler: None,
            store,
            settings,
        }
    }

    /// Label lines with `classifier`, falling back to heuristics when it
    /// returns nothing.
    pub fn with_classifier(mut self, classifier: BatchClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Enable video import.
    pub fn with_video_decoder(mut self, decoder: Arc<dyn VideoDecoder>) -> Self {
        self.sampler =
            Some(FrameSampler::new(decoder).with_max_frames(self.settings.max_video_frames));
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Load the file at `path` and import it.
    pub async fn import_path(
        &self,
        path: &Path,
        category: Option<String>,
        cover: Option<DynamicImage>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recipe>, PipelineError> {
        let document = document::load_document(path, &self.settings).await?;
        let request = ImportRequest {
            document,
            category,
            cover,
        };
        self.import(request, cancel).await
    }

    /// Import one document, returning the recipes saved to the store.
    ///
    /// Nothing is saved if the import is cancelled, if no ingredient or
    /// instruction is found, or if any recipe cannot be assembled.
    pub async fn import(
        &self,
        request: ImportRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recipe>, PipelineError> {
        let kind = request.document.kind();
        let category = request
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.settings.default_category.clone());

        tracing::info!(?kind, category = %category, "Importing document");

        let candidates = match request.document {
            RawDocument::Image(image) => {
                let lines = ocr::recognize_lines(self.recognizer.as_ref(), &image, "image").await;
                vec![Candidate {
                    lines: self.label_lines(&lines, cancel).await?,
                    image: Some(image),
                }]
            }
            RawDocument::Pdf { pages } => {
                let text = self.aggregator.aggregate(&pages, cancel).await;
                let thumbnail = pages
                    .first()
                    .map(|page| Arc::new(document::thumbnail(page, self.settings.thumbnail_size)));
                vec![Candidate {
                    lines: self.label_lines(&text_lines(&text), cancel).await?,
                    image: thumbnail,
                }]
            }
            RawDocument::TextFile { content } => vec![Candidate {
                lines: self.label_lines(&text_lines(&content), cancel).await?,
                image: request.cover.map(Arc::new),
            }],
            RawDocument::Video(path) => self.video_candidates(&path, cancel).await?,
        };

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let candidates: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| has_recipe_lines(&candidate.lines))
            .collect();
        if candidates.is_empty() {
            tracing::warn!(?kind, "No ingredients or instructions recognized");
            return Err(PipelineError::NothingRecognized);
        }

        // Assemble everything before the first write
        let recipes = candidates
            .into_iter()
            .map(|candidate| assemble::assemble(&candidate.lines, candidate.image, &category))
            .collect::<Result<Vec<_>, _>>()?;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        self.store.add_recipes(recipes.clone()).await?;

        tracing::info!(?kind, recipes = recipes.len(), category = %category, "Import finished");
        Ok(recipes)
    }

    /// Per-frame OCR and labelling. Frames are recognized concurrently and
    /// kept in sampled-time order.
    async fn video_candidates(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>, PipelineError> {
        let sampler = self.sampler.as_ref().ok_or_else(|| InputError::UnreadableVideo {
            path: path.to_path_buf(),
            message: "video decoding is not configured".to_string(),
        })?;

        let frames = sampler.sample(path).await?;
        let images: Vec<Arc<DynamicImage>> = frames.iter().map(|f| f.image.clone()).collect();
        let texts = self.aggregator.recognize_pages(&images, cancel).await;

        let mut candidates = Vec::with_capacity(frames.len());
        for (frame, text) in frames.into_iter().zip(texts) {
            let lines = self.label_lines(&text_lines(&text), cancel).await?;
            tracing::debug!(
                timestamp = frame.timestamp,
                lines = lines.len(),
                "Labelled video frame"
            );
            candidates.push(Candidate {
                lines,
                image: Some(frame.image),
            });
        }
        Ok(candidates)
    }

    /// Label `lines` with the classifier, or the heuristics if there is none
    /// or it produced nothing.
    pub async fn label_lines(
        &self,
        lines: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ClassifiedLine>, PipelineError> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(classifier) = &self.classifier {
            let classified = classifier.classify(lines, cancel).await;
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            if !classified.is_empty() {
                return Ok(classified);
            }
            tracing::warn!(
                backend = classifier.backend_name(),
                error = %PipelineError::BackendUnavailable,
                "Falling back to keyword heuristics"
            );
        }

        Ok(lines
            .iter()
            .map(|line| ClassifiedLine::new(line.clone(), segment::label_line(line)))
            .collect())
    }
}

fn has_recipe_lines(lines: &[ClassifiedLine]) -> bool {
    lines
        .iter()
        .any(|l| matches!(l.label, Label::Ingredient | Label::Instruction))
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use super::*;
    use crate::classify::LabelBackend;
    use crate::error::{AssemblyError, StoreError};
    use crate::ocr::tests::{blank, MockRecognizer};
    use crate::store::RecipeStore;
    use crate::video::tests::{frame_width, MockDecoder};

    struct FailingBackend;

    #[async_trait]
    impl LabelBackend for FailingBackend {
        async fn classify_one(&self, _line: &str) -> Result<Label> {
            bail!("service unavailable")
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    /// Labels everything as an ingredient.
    struct IngredientBackend;

    #[async_trait]
    impl LabelBackend for IngredientBackend {
        async fn classify_one(&self, _line: &str) -> Result<Label> {
            Ok(Label::Ingredient)
        }

        fn backend_name(&self) -> &'static str {
            "ingredient"
        }
    }

    fn importer(recognizer: MockRecognizer) -> Importer {
        Importer::new(
            Arc::new(recognizer),
            StoreHandle::spawn(RecipeStore::new()),
            Settings::default(),
        )
    }

    const CARD: &str = "Pancakes\n2 cups flour\n1 tsp salt\nStep 1: Mix the dry ingredients\nThen fry";

    #[tokio::test]
    async fn test_import_image() {
        let importer = importer(MockRecognizer::new().with_text(10, CARD, 0));
        let request = ImportRequest::new(RawDocument::Image(Arc::new(blank(10))))
            .with_category("Breakfast");

        let recipes = importer.import(request, &CancellationToken::new()).await.unwrap();

        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].ingredients, vec!["2 cups flour", "1 tsp salt"]);
        assert_eq!(
            recipes[0].instructions,
            vec!["Step 1: Mix the dry ingredients", "Then fry"]
        );
        assert_eq!(importer.store().recipes("Breakfast").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_import_uses_default_category() {
        let importer = importer(MockRecognizer::new().with_text(10, CARD, 0));
        let request = ImportRequest::new(RawDocument::Image(Arc::new(blank(10))));

        let recipes = importer.import(request, &CancellationToken::new()).await.unwrap();
        assert_eq!(recipes[0].category, "Uncategorized");
    }

    #[tokio::test]
    async fn test_import_pdf_is_one_recipe_in_page_order() {
        let recognizer = MockRecognizer::new()
            .with_text(600, "2 cups flour", 100)
            .with_text(20, "Step 1: Mix", 0);
        let importer = importer(recognizer);
        let pages = vec![
            Arc::new(DynamicImage::new_rgb8(600, 4)),
            Arc::new(blank(20)),
        ];

        let recipes = importer
            .import(
                ImportRequest::new(RawDocument::Pdf { pages }),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].ingredients, vec!["2 cups flour"]);
        assert_eq!(recipes[0].instructions, vec!["Step 1: Mix"]);
        assert_eq!(recipes[0].image.width(), 300);
    }

    #[tokio::test]
    async fn test_import_text_without_cover_is_missing_image() {
        let importer = importer(MockRecognizer::new());
        let request = ImportRequest::new(RawDocument::TextFile {
            content: CARD.to_string(),
        });

        let err = importer.import(request, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Assembly(AssemblyError::MissingImage)));
        assert!(importer.store().list_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_text_with_cover() {
        let importer = importer(MockRecognizer::new());
        let request = ImportRequest::new(RawDocument::TextFile {
            content: CARD.to_string(),
        })
        .with_cover(blank(5));

        let recipes = importer.import(request, &CancellationToken::new()).await.unwrap();
        assert_eq!(recipes[0].ingredients.len(), 2);
        assert_eq!(recipes[0].image.width(), 5);
    }

    #[tokio::test]
    async fn test_import_nothing_recognized() {
        let importer = importer(MockRecognizer::new().with_text(10, "Pancakes\nServes four", 0));
        let request = ImportRequest::new(RawDocument::Image(Arc::new(blank(10))));

        let err = importer.import(request, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NothingRecognized));
        assert!(importer.store().list_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_ocr_failure_is_nothing_recognized() {
        let importer = importer(MockRecognizer::new());
        let request = ImportRequest::new(RawDocument::Image(Arc::new(blank(10))));

        let err = importer.import(request, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NothingRecognized));
    }

    #[tokio::test]
    async fn test_video_yields_recipe_per_frame() {
        // 10s video: frames at 0, 2, 4, 6, 8; the frame at 4s has no text
        let recognizer = MockRecognizer::new()
            .with_text(frame_width(0.0), "2 cups flour", 50)
            .with_text(frame_width(2.0), "Step 1: Mix", 0)
            .with_text(frame_width(6.0), "Serves four", 0)
            .with_text(frame_width(8.0), "1 tsp salt", 10);
        let importer = importer(recognizer).with_video_decoder(Arc::new(MockDecoder::new(10.0)));

        let recipes = importer
            .import(
                ImportRequest::new(RawDocument::Video("clip.mp4".into())).with_category("Videos"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(recipes.len(), 3);
        assert_eq!(recipes[0].ingredients, vec!["2 cups flour"]);
        assert_eq!(recipes[1].instructions, vec!["Step 1: Mix"]);
        assert_eq!(recipes[2].ingredients, vec!["1 tsp salt"]);
        assert_eq!(importer.store().recipes("Videos").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rejected_video_batch_saves_no_frame() {
        let recognizer = MockRecognizer::new()
            .with_text(frame_width(0.0), "2 cups flour", 0)
            .with_text(frame_width(2.0), "Step 1: Mix", 0);
        let settings = Settings {
            default_category: String::new(),
            ..Settings::default()
        };
        let store = StoreHandle::spawn(RecipeStore::new());
        let importer = Importer::new(Arc::new(recognizer), store.clone(), settings)
            .with_video_decoder(Arc::new(MockDecoder::new(10.0)));

        let err = importer
            .import(
                ImportRequest::new(RawDocument::Video("clip.mp4".into())),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Store(StoreError::EmptyCategoryName)
        ));
        assert!(store.list_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_video_without_decoder() {
        let importer = importer(MockRecognizer::new());
        let err = importer
            .import(
                ImportRequest::new(RawDocument::Video("clip.mp4".into())),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Input(InputError::UnreadableVideo { .. })
        ));
    }

    #[tokio::test]
    async fn test_failing_classifier_falls_back_to_heuristics() {
        let importer = importer(MockRecognizer::new().with_text(10, CARD, 0))
            .with_classifier(BatchClassifier::new(Arc::new(FailingBackend)));
        let request = ImportRequest::new(RawDocument::Image(Arc::new(blank(10))));

        let recipes = importer.import(request, &CancellationToken::new()).await.unwrap();
        assert_eq!(recipes[0].ingredients, vec!["2 cups flour", "1 tsp salt"]);
        assert_eq!(recipes[0].instructions.len(), 2);
    }

    #[tokio::test]
    async fn test_classifier_labels_are_used() {
        let importer = importer(MockRecognizer::new().with_text(10, CARD, 0))
            .with_classifier(BatchClassifier::new(Arc::new(IngredientBackend)));
        let request = ImportRequest::new(RawDocument::Image(Arc::new(blank(10))));

        let recipes = importer.import(request, &CancellationToken::new()).await.unwrap();
        assert_eq!(recipes[0].ingredients.len(), 5);
        assert_eq!(recipes[0].ingredients[0], "Pancakes");
        assert!(recipes[0].instructions.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_import_saves_nothing() {
        let importer = importer(MockRecognizer::new().with_text(10, CARD, 0));
        let request = ImportRequest::new(RawDocument::Image(Arc::new(blank(10))));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = importer.import(request, &cancel).await.unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled));
        assert!(importer.store().list_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_path_text_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("recipe.txt");
        std::fs::write(&path, CARD).unwrap();

        let importer = importer(MockRecognizer::new());
        let recipes = importer
            .import_path(&path, Some("Saved".to_string()), Some(blank(3)), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(recipes.len(), 1);
        assert_eq!(importer.store().list_categories().await.unwrap(), vec!["Saved"]);
    }

    #[tokio::test]
    async fn test_import_path_unsupported_extension() {
        let importer = importer(MockRecognizer::new());
        let err = importer
            .import_path(Path::new("recipe.docx"), None, None, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Input(InputError::UnsupportedExtension(_))
        ));
        assert!(importer.store().list_categories().await.unwrap().is_empty());
    }
}
