//! Turning input files into documents the pipeline can consume.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use crate::config::Settings;
use crate::error::{InputError, PipelineError};
use crate::pdf;

/// Kind of input, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Pdf,
    TextFile,
    Video,
}

impl DocumentKind {
    /// Classify `path` by its lower-cased extension.
    pub fn from_path(path: &Path) -> Result<Self, InputError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "png" | "jpg" | "jpeg" => Ok(Self::Image),
            "pdf" => Ok(Self::Pdf),
            "txt" | "text" => Ok(Self::TextFile),
            "mov" | "mp4" | "m4v" => Ok(Self::Video),
            _ => Err(InputError::UnsupportedExtension(extension)),
        }
    }
}

/// A loaded input document. Consumed once by the importer.
#[derive(Debug, Clone)]
pub enum RawDocument {
    Image(Arc<DynamicImage>),
    Pdf { pages: Vec<Arc<DynamicImage>> },
    TextFile { content: String },
    Video(PathBuf),
}

impl RawDocument {
    pub fn kind(&self) -> DocumentKind {
        match self {
            RawDocument::Image(_) => DocumentKind::Image,
            RawDocument::Pdf { .. } => DocumentKind::Pdf,
            RawDocument::TextFile { .. } => DocumentKind::TextFile,
            RawDocument::Video(_) => DocumentKind::Video,
        }
    }
}

/// Load the document at `path`.
///
/// Unsupported extensions are rejected before the file is touched.
pub async fn load_document(path: &Path, settings: &Settings) -> Result<RawDocument, PipelineError> {
    let kind = DocumentKind::from_path(path)?;
    tracing::debug!(path = %path.display(), ?kind, "Loading document");

    let unreadable = |message: String| InputError::Unreadable {
        path: path.to_path_buf(),
        message,
    };

    let document = match kind {
        DocumentKind::Image => RawDocument::Image(Arc::new(load_image(path).await?)),
        DocumentKind::Pdf => {
            let owned = path.to_path_buf();
            let scale = settings.pdf_render_scale;
            let pages = tokio::task::spawn_blocking(move || pdf::render_pages(&owned, scale))
                .await
                .map_err(|e| unreadable(e.to_string()))?
                .map_err(|e| unreadable(format!("{:#}", e)))?;
            RawDocument::Pdf {
                pages: pages.into_iter().map(Arc::new).collect(),
            }
        }
        DocumentKind::TextFile => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| unreadable(e.to_string()))?;
            let content =
                String::from_utf8(bytes).map_err(|_| InputError::InvalidText(path.to_path_buf()))?;
            RawDocument::TextFile { content }
        }
        DocumentKind::Video => {
            let metadata = tokio::fs::metadata(path)
                .await
                .map_err(|e| unreadable(e.to_string()))?;
            if !metadata.is_file() {
                return Err(unreadable("not a file".to_string()).into());
            }
            RawDocument::Video(path.to_path_buf())
        }
    };

    Ok(document)
}

/// Read and decode an image file (PNG or JPEG).
pub async fn load_image(path: &Path) -> Result<DynamicImage, InputError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| InputError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| InputError::InvalidImage(e.to_string()))?
        .map_err(|e| InputError::InvalidImage(e.to_string()))
}

/// Shrink `image` to fit a `size` x `size` box, keeping aspect ratio.
/// Images already inside the box are returned as is.
pub fn thumbnail(image: &DynamicImage, size: u32) -> DynamicImage {
    if image.width() <= size && image.height() <= size {
        return image.clone();
    }
    image.thumbnail(size, size)
}

#[cfg(test)]
mod tests {
    use image::ImageFormat;

    use super::*;

    fn write_png(path: &Path, width: u32, height: u32) {
        DynamicImage::new_rgb8(width, height)
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(DocumentKind::from_path(Path::new("a.PNG")).unwrap(), DocumentKind::Image);
        assert_eq!(DocumentKind::from_path(Path::new("a.jpeg")).unwrap(), DocumentKind::Image);
        assert_eq!(DocumentKind::from_path(Path::new("a.pdf")).unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_path(Path::new("a.txt")).unwrap(), DocumentKind::TextFile);
        assert_eq!(DocumentKind::from_path(Path::new("a.MOV")).unwrap(), DocumentKind::Video);
    }

    #[test]
    fn test_kind_unsupported() {
        assert!(matches!(
            DocumentKind::from_path(Path::new("recipe.docx")),
            Err(InputError::UnsupportedExtension(ext)) if ext == "docx"
        ));
        assert!(matches!(
            DocumentKind::from_path(Path::new("README")),
            Err(InputError::UnsupportedExtension(ext)) if ext.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_load_image() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("card.png");
        write_png(&path, 40, 20);

        let document = load_document(&path, &Settings::default()).await.unwrap();
        match document {
            RawDocument::Image(image) => assert_eq!(image.width(), 40),
            other => panic!("expected image, got {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_load_invalid_image() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("card.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let err = load_document(&path, &Settings::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Input(InputError::InvalidImage(_))));
    }

    #[tokio::test]
    async fn test_load_text_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("recipe.txt");
        std::fs::write(&path, "2 cups flour\nStep 1: Mix").unwrap();

        let document = load_document(&path, &Settings::default()).await.unwrap();
        assert!(matches!(
            document,
            RawDocument::TextFile { ref content } if content == "2 cups flour\nStep 1: Mix"
        ));
    }

    #[tokio::test]
    async fn test_load_non_utf8_text() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("recipe.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = load_document(&path, &Settings::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Input(InputError::InvalidText(_))));
    }

    #[tokio::test]
    async fn test_load_pdf_pages() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("recipe.pdf");
        std::fs::write(&path, pdf::tests::create_test_pdf(&["2 cups flour", "Mix"])).unwrap();

        let settings = Settings {
            pdf_render_scale: 0.5,
            ..Settings::default()
        };
        let document = load_document(&path, &settings).await.unwrap();
        match document {
            RawDocument::Pdf { pages } => {
                assert_eq!(pages.len(), 2);
                assert_eq!(pages[0].width(), 306);
            }
            other => panic!("expected pdf, got {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_load_missing_video() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("missing.mp4");

        let err = load_document(&path, &Settings::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Input(InputError::Unreadable { .. })));
    }

    #[tokio::test]
    async fn test_unsupported_extension_touches_nothing() {
        let err = load_document(Path::new("/nonexistent/recipe.docx"), &Settings::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Input(InputError::UnsupportedExtension(_))
        ));
    }

    #[test]
    fn test_thumbnail_fits_box() {
        let thumb = thumbnail(&DynamicImage::new_rgb8(1200, 600), 300);
        assert_eq!((thumb.width(), thumb.height()), (300, 150));

        let small = thumbnail(&DynamicImage::new_rgb8(40, 20), 300);
        assert_eq!((small.width(), small.height()), (40, 20));
    }
}
