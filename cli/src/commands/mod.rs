use std::path::{Path, PathBuf};

use anyhow::Context;
use recipe_core::segment::{self, Segmented};
use recipe_core::types::text_lines;
use recipe_core::{load_image, ClassifiedLine, Importer, Recipe};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::CommandError;

#[cfg(test)]
mod tests;

/// Arguments of the `import` command
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub files: Vec<PathBuf>,
    pub category: Option<String>,
    pub cover: Option<PathBuf>,
}

/// Outcome of importing one file
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub path: String,
    pub recipes: Vec<Recipe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

/// Import every file in order. A failing file is reported and the rest
/// carry on; a cancelled run stops at the current file.
pub async fn import(
    importer: &Importer,
    options: ImportOptions,
    cancel: &CancellationToken,
) -> anyhow::Result<Vec<ImportReport>> {
    let cover = match &options.cover {
        Some(path) => Some(
            load_image(path)
                .await
                .with_context(|| format!("Failed to load cover image {}", path.display()))?,
        ),
        None => None,
    };

    let mut reports = Vec::with_capacity(options.files.len());
    for path in &options.files {
        if cancel.is_cancelled() {
            break;
        }

        let result = importer
            .import_path(path, options.category.clone(), cover.clone(), cancel)
            .await;

        let report = match result {
            Ok(recipes) => ImportReport {
                path: path.display().to_string(),
                recipes,
                error: None,
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Import failed");
                ImportReport {
                    path: path.display().to_string(),
                    recipes: Vec::new(),
                    error: Some(CommandError::from(e)),
                }
            }
        };
        reports.push(report);
    }

    Ok(reports)
}

/// Keyword-heuristic split of a text file
pub async fn segment(path: &Path) -> anyhow::Result<Segmented> {
    let text = read_text(path).await?;
    Ok(segment::segment(&text))
}

/// Label every line of a text file with the importer's classifier
pub async fn classify(
    importer: &Importer,
    path: &Path,
    cancel: &CancellationToken,
) -> anyhow::Result<Vec<ClassifiedLine>> {
    let text = read_text(path).await?;
    let lines = importer.label_lines(&text_lines(&text), cancel).await?;
    Ok(lines)
}

async fn read_text(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
