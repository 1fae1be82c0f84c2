//! PDF rasterization for per-page OCR.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Document, Matrix};

/// Render every page of the PDF at `path` to an RGB image, in page order.
///
/// `scale` is the zoom relative to 72 dpi. This is CPU-bound; call it from
/// the blocking pool.
pub fn render_pages(path: &Path, scale: f32) -> Result<Vec<DynamicImage>> {
    let path_str = path.to_str().context("PDF path is not valid UTF-8")?;
    let document = Document::open(path_str).context("Failed to open PDF")?;
    let page_count = document.page_count().context("Failed to count PDF pages")?;

    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();

    let mut pages = Vec::with_capacity(page_count.max(0) as usize);
    for index in 0..page_count {
        let page = document
            .load_page(index)
            .with_context(|| format!("Failed to load page {}", index))?;
        let pixmap = page
            .to_pixmap(&matrix, &colorspace, false, true)
            .with_context(|| format!("Failed to render page {}", index))?;

        let image = pixmap_to_image(
            pixmap.width(),
            pixmap.height(),
            pixmap.n() as usize,
            pixmap.samples(),
        )
        .with_context(|| format!("Unexpected pixel layout on page {}", index))?;
        pages.push(image);
    }

    tracing::debug!(path = %path.display(), pages = pages.len(), "Rasterized PDF");
    Ok(pages)
}

/// Copy packed pixmap samples into an RGB image, dropping any row padding
/// and extra channels.
fn pixmap_to_image(width: u32, height: u32, channels: usize, samples: &[u8]) -> Result<DynamicImage> {
    ensure!(channels >= 3, "expected at least 3 channels, got {}", channels);
    ensure!(width > 0 && height > 0, "empty page");

    let row_len = width as usize * channels;
    let stride = samples.len() / height as usize;
    ensure!(stride >= row_len, "sample buffer too small");

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for row in samples.chunks(stride).take(height as usize) {
        for pixel in row[..row_len].chunks(channels) {
            rgb.extend_from_slice(&pixel[..3]);
        }
    }

    let image = RgbImage::from_raw(width, height, rgb).context("pixel buffer size mismatch")?;
    Ok(DynamicImage::ImageRgb8(image))
}
