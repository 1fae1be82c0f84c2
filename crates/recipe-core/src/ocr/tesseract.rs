//! Tesseract OCR via the `tesseract` command-line tool
//!
//! The image is piped to `tesseract stdin stdout` as PNG and plain text is
//! read back, one recognized line per output line.

use std::io::Cursor;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use tokio::io::AsyncWriteExt;

use super::TextRecognizer;
use crate::types::text_lines;

/// Recognizer backed by a local `tesseract` install.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: String,
    language: String,
}

impl TesseractRecognizer {
    pub fn new(language: &str) -> Self {
        Self::with_program("tesseract", language)
    }

    /// Use a specific tesseract binary
    pub fn with_program(program: &str, language: &str) -> Self {
        Self {
            program: program.to_string(),
            language: language.to_string(),
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>> {
        let png = encode_png(image)?;

        let mut child = tokio::process::Command::new(&self.program)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.program))?;

        let mut stdin = child
            .stdin
            .take()
            .context("No stdin for tesseract process")?;
        let writer = tokio::spawn(async move {
            stdin.write_all(&png).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for tesseract")?;

        if !output.status.success() {
            bail!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        writer
            .await
            .context("Tesseract writer task panicked")?
            .context("Failed to write image to tesseract")?;

        Ok(parse_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .context("Failed to encode image as PNG")?;
    Ok(buf.into_inner())
}

/// Split tesseract's plain-text output into lines.
fn parse_output(stdout: &str) -> Vec<String> {
    text_lines(stdout)
}
