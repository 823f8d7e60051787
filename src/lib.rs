use std::path::{Path, PathBuf};
use serde::Serialize;

pub mod audio;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod utils;

/// Marker that a downloader leaves in the name of a file or folder it is still writing.
pub const INCOMPLETE_MARKER: &str = "INCOMPLETE~";

#[derive(Debug, Clone, Serialize)]
pub struct AudioFile {
    pub path: PathBuf,
    pub file_name: String,
    /// Extension as found on disk, including the leading dot.
    pub extension: String,
    pub size_bytes: u64,
    pub is_incomplete: bool,
}

impl AudioFile {
    /// Builds an `AudioFile` when `path` carries one of the `supported` extensions.
    /// Matching is case-insensitive; `supported` entries include the leading dot.
    pub fn from_path(path: impl AsRef<Path>, supported: &[String]) -> Option<Self> {
        let path = path.as_ref();
        let file_name = path.file_name()?.to_str()?.to_string();
        let ext = path.extension()?.to_str()?;
        let extension = format!(".{}", ext);

        let lowered = extension.to_lowercase();
        if !supported.iter().any(|s| s.to_lowercase() == lowered) {
            return None;
        }

        let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        Some(Self {
            is_incomplete: path.to_string_lossy().contains(INCOMPLETE_MARKER),
            path: path.to_path_buf(),
            file_name,
            extension,
            size_bytes,
        })
    }

    /// File name with the extension removed.
    pub fn stem(&self) -> &str {
        self.file_name
            .strip_suffix(self.extension.as_str())
            .unwrap_or(&self.file_name)
    }

    pub fn is_flac(&self) -> bool {
        self.extension.eq_ignore_ascii_case(".flac")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Tag error: {0}")]
    Tag(String),
    #[error("Tempo detection error: {0}")]
    Tempo(String),
    #[error("External tool error: {0}")]
    Tool(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, AudioError>;

// Re-exports for convenience
pub use audio::tags::{LoftyTagStore, TagSet, TagStore};
pub use audio::tempo::{CommandTempoEstimator, FlacTool, TempoEstimator};
pub use config::Settings;
pub use pipeline::orchestrator::{Orchestrator, PassReport, StatusReport};
pub use pipeline::scheduler::{Service, StopHandle};
