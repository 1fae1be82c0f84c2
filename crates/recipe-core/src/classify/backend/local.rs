//! Local model backend
//!
//! Runs a small sequence classification model in-process. The tokenizer is
//! treated as an opaque encoder producing fixed-length ids and mask; the model
//! turns those into one logit per label.
//!
//! This backend is library API for embedders that bring their own inference
//! engine as a [`SequenceModel`]. It is not selectable from [`Settings`]:
//! build it with [`HubTokenizer::from_hub`] (or [`HubTokenizer::from_file`])
//! and a model, then hand it to
//! [`BatchClassifier`](crate::classify::BatchClassifier) and
//! [`Importer::with_classifier`](crate::pipeline::Importer::with_classifier).
//!
//! [`Settings`]: crate::config::Settings

use std::path::Path;
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use hf_hub::api::tokio::Api;
use tokenizers::Tokenizer;

use super::LabelBackend;
use crate::types::Label;

/// Sequence length the model was traced with
pub const MAX_SEQUENCE_LEN: usize = 32;

/// Token ids and attention mask for one line, both `MAX_SEQUENCE_LEN` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLine {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
}

/// Turns a line of text into model input.
pub trait LineEncoder: Send + Sync {
    fn encode(&self, line: &str) -> Result<EncodedLine>;
}

/// In-process inference: one logit per label.
pub trait SequenceModel: Send + Sync {
    fn logits(&self, input: &EncodedLine) -> Result<Vec<f32>>;
}

/// [`LineEncoder`] backed by a Hugging Face tokenizer.
pub struct HubTokenizer(Tokenizer);

impl HubTokenizer {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self(tokenizer)
    }

    /// Load `tokenizer.json` from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(Self(tokenizer))
    }

    /// Download `tokenizer.json` from a HuggingFace repository
    pub async fn from_hub(hf_repo_id: &str) -> Result<Self> {
        tracing::info!("Loading tokenizer: {}", hf_repo_id);

        let api = Api::new().context("Failed to create HuggingFace API")?;
        let repo = api.model(hf_repo_id.to_string());
        let tokenizer_path = repo
            .get("tokenizer.json")
            .await
            .context("Failed to download tokenizer.json")?;

        Self::from_file(&tokenizer_path)
    }
}

impl LineEncoder for HubTokenizer {
    fn encode(&self, line: &str) -> Result<EncodedLine> {
        let encoding = self
            .0
            .encode(line, true)
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(EncodedLine {
            input_ids: pad_to_length(encoding.get_ids()),
            attention_mask: pad_to_length(encoding.get_attention_mask()),
        })
    }
}

/// Truncate or zero-pad to [`MAX_SEQUENCE_LEN`].
pub fn pad_to_length(values: &[u32]) -> Vec<i64> {
    let mut padded: Vec<i64> = values
        .iter()
        .take(MAX_SEQUENCE_LEN)
        .map(|&v| i64::from(v))
        .collect();
    padded.resize(MAX_SEQUENCE_LEN, 0);
    padded
}

/// Local model provider
pub struct LocalBackend {
    encoder: Arc<dyn LineEncoder>,
    model: Arc<dyn SequenceModel>,
    labels: Vec<Label>,
}

impl LocalBackend {
    /// Create a backend whose model outputs `[ingredient, instruction]` logits.
    pub fn new(encoder: Arc<dyn LineEncoder>, model: Arc<dyn SequenceModel>) -> Self {
        Self::with_labels(encoder, model, vec![Label::Ingredient, Label::Instruction])
    }

    /// Create a backend with a custom logit-to-label order.
    pub fn with_labels(
        encoder: Arc<dyn LineEncoder>,
        model: Arc<dyn SequenceModel>,
        labels: Vec<Label>,
    ) -> Self {
        Self {
            encoder,
            model,
            labels,
        }
    }

    fn predict(
        encoder: &dyn LineEncoder,
        model: &dyn SequenceModel,
        labels: &[Label],
        line: &str,
    ) -> Result<Label> {
        let input = encoder.encode(line)?;
        let logits = model.logits(&input)?;
        ensure!(
            logits.len() == labels.len(),
            "Model returned {} logits for {} labels",
            logits.len(),
            labels.len()
        );

        let best = logits
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
            .context("Model returned no usable logits")?;
        Ok(labels[best])
    }
}

#[async_trait]
impl LabelBackend for LocalBackend {
    async fn classify_one(&self, line: &str) -> Result<Label> {
        let encoder = self.encoder.clone();
        let model = self.model.clone();
        let labels = self.labels.clone();
        let line = line.to_string();

        tokio::task::spawn_blocking(move || {
            Self::predict(encoder.as_ref(), model.as_ref(), &labels, &line)
        })
        .await
        .context("Inference task panicked")?
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
