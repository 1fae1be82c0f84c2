//! OCR collaborator and multi-page aggregation.
//!
//! The recognizer itself is external (Tesseract in the CLI, a mock in tests).
//! [`PageAggregator`] runs one recognition per page concurrently and joins the
//! page texts in page order.

pub mod tesseract;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use image::DynamicImage;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;

pub use tesseract::TesseractRecognizer;

/// Default number of pages recognized at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Line-level text recognition for a single image.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize text lines, top to bottom.
    async fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>>;
}

/// Recognize `image`, treating failure as "no text".
///
/// Returned lines are trimmed and non-empty. `unit` names the source in logs
/// (e.g. `page 2`, `frame 0`).
pub async fn recognize_lines(
    recognizer: &dyn TextRecognizer,
    image: &DynamicImage,
    unit: &str,
) -> Vec<String> {
    match recognizer.recognize(image).await {
        Ok(lines) => lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        Err(e) => {
            let err = PipelineError::Ocr {
                unit: unit.to_string(),
                message: format!("{:#}", e),
            };
            tracing::warn!(error = %err, "OCR failed, continuing without text");
            Vec::new()
        }
    }
}

/// Concurrent per-page OCR.
#[derive(Clone)]
pub struct PageAggregator {
    recognizer: Arc<dyn TextRecognizer>,
    max_concurrent: usize,
}

impl PageAggregator {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            recognizer,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Recognize every page, returning one text per page in page order.
    ///
    /// A page that fails (or is still running when `cancel` fires) yields an
    /// empty string.
    pub async fn recognize_pages(
        &self,
        pages: &[Arc<DynamicImage>],
        cancel: &CancellationToken,
    ) -> Vec<String> {
        let mut texts = vec![String::new(); pages.len()];
        if pages.is_empty() {
            return texts;
        }

        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let mut in_flight = JoinSet::new();

        for (page, image) in pages.iter().enumerate() {
            let recognizer = self.recognizer.clone();
            let permits = permits.clone();
            let image = image.clone();

            in_flight.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (page, String::new());
                };
                let unit = format!("page {}", page);
                let lines = recognize_lines(recognizer.as_ref(), &image, &unit).await;
                (page, lines.join("\n"))
            });
        }

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::debug!(remaining = in_flight.len(), "Page OCR cancelled");
                    in_flight.abort_all();
                    break;
                }

                joined = in_flight.join_next() => {
                    match joined {
                        Some(Ok((page, text))) => texts[page] = text,
                        Some(Err(e)) => tracing::error!(error = %e, "Page OCR task panicked"),
                        None => break,
                    }
                }
            }
        }

        tracing::debug!(pages = pages.len(), "Recognized pages");
        texts
    }

    /// Recognize every page and join the page texts with newlines.
    pub async fn aggregate(
        &self,
        pages: &[Arc<DynamicImage>],
        cancel: &CancellationToken,
    ) -> String {
        self.recognize_pages(pages, cancel).await.join("\n")
    }
}
