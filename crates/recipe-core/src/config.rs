use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root data directory (~/.local/share/recipe-adapter)
    pub data_dir: PathBuf,
    /// User settings file
    pub settings_file: PathBuf,
}

impl Config {
    /// Load configuration or use defaults
    pub fn load_or_default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("recipe-adapter");

        Self {
            settings_file: data_dir.join("settings.json"),
            data_dir,
        }
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

/// Which line classification backend to use.
///
/// The local model backend has no variant; embedders wire it in code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Keyword heuristics only
    #[default]
    Heuristic,
    /// HTTP classification service exposing `POST /classify`
    Remote { endpoint: String },
}

impl BackendConfig {
    /// Get the backend type name
    pub fn backend_type(&self) -> &'static str {
        match self {
            BackendConfig::Heuristic => "heuristic",
            BackendConfig::Remote { .. } => "remote",
        }
    }
}

/// User-tunable pipeline settings, persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendConfig,
    /// Maximum simultaneous in-flight line classifications
    pub max_concurrent_classifications: usize,
    /// Per-line classification timeout in milliseconds
    pub classify_timeout_ms: u64,
    /// Maximum simultaneous OCR calls (pages or frames)
    pub max_concurrent_ocr: usize,
    /// Maximum frames sampled from a video
    pub max_video_frames: usize,
    /// Zoom factor used when rasterizing PDF pages for OCR
    pub pdf_render_scale: f32,
    /// Bounding box (pixels) of the thumbnail kept with PDF recipes
    pub thumbnail_size: u32,
    /// Tesseract language code
    pub ocr_language: String,
    /// Category used when none is given
    pub default_category: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            max_concurrent_classifications: 3,
            classify_timeout_ms: 5_000,
            max_concurrent_ocr: 4,
            max_video_frames: 5,
            pdf_render_scale: 2.0,
            thumbnail_size: 300,
            ocr_language: "eng".to_string(),
            default_category: "Uncategorized".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults if the file is
    /// missing or invalid.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Invalid settings file, using defaults");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read settings, using defaults");
                Self::default()
            }
        }
    }

    /// Write settings to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json).context("Failed to write settings file")?;
        Ok(())
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }
}
