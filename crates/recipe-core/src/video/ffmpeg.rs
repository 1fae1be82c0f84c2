//! Video decoding through the `ffprobe` and `ffmpeg` command-line tools

use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use image::DynamicImage;

use super::VideoDecoder;

/// [`VideoDecoder`] that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegDecoder {
    pub fn new(ffmpeg: &str, ffprobe: &str) -> Self {
        Self {
            ffmpeg: ffmpeg.to_string(),
            ffprobe: ffprobe.to_string(),
        }
    }
}

#[async_trait]
impl VideoDecoder for FfmpegDecoder {
    async fn duration(&self, path: &Path) -> Result<f64> {
        let output = tokio::process::Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ffprobe))?;

        if !output.status.success() {
            bail!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    async fn frame_at(&self, path: &Path, timestamp: f64) -> Result<DynamicImage> {
        let output = tokio::process::Command::new(&self.ffmpeg)
            .args(["-v", "error", "-ss", &format!("{:.3}", timestamp), "-i"])
            .arg(path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ffmpeg))?;

        if !output.status.success() {
            bail!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        if output.stdout.is_empty() {
            bail!("No frame at {:.3}s", timestamp);
        }

        image::load_from_memory(&output.stdout).context("Failed to decode extracted frame")
    }
}

fn parse_duration(stdout: &str) -> Result<f64> {
    let value = stdout.trim();
    let duration: f64 = value
        .parse()
        .with_context(|| format!("Unexpected ffprobe duration: {:?}", value))?;
    if !duration.is_finite() || duration < 0.0 {
        bail!("Invalid video duration: {}", duration);
    }
    Ok(duration)
}
