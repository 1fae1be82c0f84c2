//! Still-frame sampling from video files.
//!
//! Frames are taken at evenly spaced timestamps starting at t=0. Each sampled
//! frame later becomes its own OCR input and, if it yields any recipe lines,
//! its own recipe.

pub mod ffmpeg;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use image::DynamicImage;

use crate::error::{InputError, PipelineError};

pub use ffmpeg::FfmpegDecoder;

/// Default number of frames sampled from one video.
pub const DEFAULT_MAX_FRAMES: usize = 5;

/// Smallest gap between two sampled frames, in seconds.
pub const MIN_INTERVAL_SECS: f64 = 1.0;

/// Access to a video's duration and individual frames.
#[async_trait]
pub trait VideoDecoder: Send + Sync {
    /// Duration in seconds.
    async fn duration(&self, path: &Path) -> Result<f64>;

    /// Decode the frame shown at `timestamp` seconds.
    async fn frame_at(&self, path: &Path, timestamp: f64) -> Result<DynamicImage>;
}

/// A decoded frame and the time it was taken at.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub timestamp: f64,
    pub image: Arc<DynamicImage>,
}

/// Timestamps to sample for a video of `duration` seconds.
///
/// `interval = max(1.0, duration / max_frames)`; t=0 is always included and
/// later timestamps must fall before the end of the video.
pub fn sample_timestamps(duration: f64, max_frames: usize) -> Vec<f64> {
    if max_frames == 0 {
        return Vec::new();
    }
    let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
    let interval = (duration / max_frames as f64).max(MIN_INTERVAL_SECS);

    (0..max_frames)
        .map(|k| k as f64 * interval)
        .enumerate()
        .filter(|&(k, t)| k == 0 || t < duration)
        .map(|(_, t)| t)
        .collect()
}

/// Samples up to `max_frames` frames from a video.
#[derive(Clone)]
pub struct FrameSampler {
    decoder: Arc<dyn VideoDecoder>,
    max_frames: usize,
}

impl FrameSampler {
    pub fn new(decoder: Arc<dyn VideoDecoder>) -> Self {
        Self {
            decoder,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Sample frames in timestamp order.
    ///
    /// Frames that fail to decode are skipped. A video whose duration cannot
    /// be read is an [`InputError::UnreadableVideo`].
    pub async fn sample(&self, path: &Path) -> Result<Vec<SampledFrame>, PipelineError> {
        let duration = self.decoder.duration(path).await.map_err(|e| {
            PipelineError::from(InputError::UnreadableVideo {
                path: PathBuf::from(path),
                message: format!("{:#}", e),
            })
        })?;

        let timestamps = sample_timestamps(duration, self.max_frames);
        let mut frames = Vec::with_capacity(timestamps.len());

        for (index, timestamp) in timestamps.into_iter().enumerate() {
            match self.decoder.frame_at(path, timestamp).await {
                Ok(image) => frames.push(SampledFrame {
                    timestamp,
                    image: Arc::new(image),
                }),
                Err(e) => {
                    let err = PipelineError::Ocr {
                        unit: format!("frame {} ({:.1}s)", index, timestamp),
                        message: format!("{:#}", e),
                    };
                    tracing::warn!(error = %err, "Skipping undecodable frame");
                }
            }
        }

        tracing::info!(
            path = %path.display(),
            duration,
            frames = frames.len(),
            "Sampled video frames"
        );
        Ok(frames)
    }
}
