//! Runtime settings, loaded once at startup and handed to every component

use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::{AudioError, Result};

/// Exclusive tempo bounds a tagged BPM must fall inside to be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpmRange {
    pub min: u32,
    pub max: u32,
}

impl BpmRange {
    pub fn contains(&self, bpm: u32) -> bool {
        bpm > self.min && bpm < self.max
    }
}

impl Default for BpmRange {
    fn default() -> Self {
        Self { min: 65, max: 135 }
    }
}

/// An external program plus the arguments that precede the file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

/// How the normalizer capitalises words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleCase {
    /// Capitalise each word and lowercase the rest, leaving all-caps words alone.
    #[default]
    Culture,
    /// Capitalise each word and lowercase everything else, acronyms included.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Watch root
    pub base_path: PathBuf,
    /// Local destination root
    pub local_path: PathBuf,
    #[serde(default)]
    pub network_path: Option<PathBuf>,
    #[serde(default)]
    pub desktop_path: Option<PathBuf>,
    /// Also place processed files on the desktop root
    #[serde(default)]
    pub desktop_copy: bool,
    /// Seconds between passes
    pub poll_interval: u64,
    #[serde(default)]
    pub include_share: bool,
    #[serde(default = "default_supported_extensions")]
    pub supported_extensions: Vec<String>,
    /// Suffixes the sanitizer leaves in place inside subdirectories
    #[serde(default = "default_sanitize_keep_extensions")]
    pub sanitize_keep_extensions: Vec<String>,
    #[serde(default)]
    pub bpm_range: BpmRange,
    #[serde(default)]
    pub correct_tempo_octave: bool,
    #[serde(default)]
    pub tempo_tool: Option<ToolCommand>,
    #[serde(default)]
    pub flac_tool: Option<ToolCommand>,
    #[serde(default)]
    pub title_case: TitleCase,
    #[serde(default)]
    pub backup_before_delete: bool,
    #[serde(default)]
    pub backup_path: Option<PathBuf>,
    /// Seconds a file's size must stay unchanged before it is processed; 0 disables
    #[serde(default = "default_file_stability_wait")]
    pub file_stability_wait: u64,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_supported_extensions() -> Vec<String> {
    [".mp3", ".m4a", ".wav", ".aif", ".aiff", ".flac"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_sanitize_keep_extensions() -> Vec<String> {
    [".mp3", ".m4a", ".txt"].iter().map(|s| s.to_string()).collect()
}

fn default_file_stability_wait() -> u64 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Reads and validates a JSON settings document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            AudioError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(text)
            .map_err(|e| AudioError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval == 0 {
            return Err(AudioError::Config("poll_interval must be at least 1 second".into()));
        }
        if self.include_share && self.network_path.is_none() {
            return Err(AudioError::Config(
                "include_share is enabled but network_path is not set".into(),
            ));
        }
        if self.backup_before_delete && self.backup_path.is_none() {
            return Err(AudioError::Config(
                "backup_before_delete is enabled but backup_path is not set".into(),
            ));
        }
        if self.desktop_copy && self.desktop_path.is_none() {
            return Err(AudioError::Config(
                "desktop_copy is enabled but desktop_path is not set".into(),
            ));
        }
        if self.bpm_range.min >= self.bpm_range.max {
            return Err(AudioError::Config(format!(
                "bpm_range min ({}) must be below max ({})",
                self.bpm_range.min, self.bpm_range.max
            )));
        }
        if self.supported_extensions.is_empty() {
            return Err(AudioError::Config("supported_extensions is empty".into()));
        }
        Ok(())
    }

    /// Network root, only when replication is switched on.
    pub fn share_root(&self) -> Option<&Path> {
        if self.include_share {
            self.network_path.as_deref()
        } else {
            None
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.base_path.join(crate::pipeline::ledger::LEDGER_FILE_NAME)
    }

    /// Non-fatal observations about a loaded configuration.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.base_path.exists() {
            warnings.push(format!("Base path does not exist (will be created): {}", self.base_path.display()));
        }
        if !self.local_path.exists() {
            warnings.push(format!("Local path does not exist (will be created): {}", self.local_path.display()));
        }
        if let Some(network) = self.share_root() {
            if !network.exists() {
                warnings.push(format!("Network path does not exist: {}", network.display()));
            }
        }
        if self.poll_interval < 5 {
            warnings.push(format!(
                "Poll interval is very low ({}s), passes will run almost back to back",
                self.poll_interval
            ));
        }
        if self.tempo_tool.is_none() {
            warnings.push("No tempo_tool configured, BPM detection is disabled".to_string());
        }
        warnings
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("Music/Incoming"),
            local_path: PathBuf::from("Music/Processed"),
            network_path: None,
            desktop_path: None,
            desktop_copy: false,
            poll_interval: 40,
            include_share: false,
            supported_extensions: default_supported_extensions(),
            sanitize_keep_extensions: default_sanitize_keep_extensions(),
            bpm_range: BpmRange::default(),
            correct_tempo_octave: false,
            tempo_tool: None,
            flac_tool: None,
            title_case: TitleCase::default(),
            backup_before_delete: false,
            backup_path: None,
            file_stability_wait: default_file_stability_wait(),
            log_file: None,
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_minimal_document_fills_defaults() {
        let settings = Settings::from_json(
            r#"{"base_path": "/in", "local_path": "/out", "poll_interval": 30}"#,
        )
        .unwrap();

        assert_eq!(settings.base_path, PathBuf::from("/in"));
        assert_eq!(settings.bpm_range, BpmRange { min: 65, max: 135 });
        assert_eq!(settings.supported_extensions.len(), 6);
        assert_eq!(settings.sanitize_keep_extensions, vec![".mp3", ".m4a", ".txt"]);
        assert_eq!(settings.title_case, TitleCase::Culture);
        assert_eq!(settings.file_stability_wait, 2);
        assert!(settings.share_root().is_none());
    }

    #[test]
    fn test_missing_required_field() {
        let err = Settings::from_json(r#"{"base_path": "/in", "poll_interval": 30}"#).unwrap_err();
        assert!(err.to_string().contains("local_path"));
    }

    #[test]
    fn test_share_without_network_path_is_rejected() {
        let err = Settings::from_json(
            r#"{"base_path": "/in", "local_path": "/out", "poll_interval": 30, "include_share": true}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AudioError::Config(_)));
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        assert!(Settings::from_json(
            r#"{"base_path": "/in", "local_path": "/out", "poll_interval": 0}"#
        )
        .is_err());
    }

    #[test]
    fn test_default_document_round_trips() {
        let json = Settings::default().to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), Settings::default());
    }

    #[test]
    fn test_bpm_range_bounds_are_exclusive() {
        let range = BpmRange::default();
        assert!(!range.contains(65));
        assert!(range.contains(66));
        assert!(range.contains(134));
        assert!(!range.contains(135));
    }

    #[test]
    fn test_tool_command_and_title_case_parse() {
        let settings = Settings::from_json(
            r#"{"base_path": "/in", "local_path": "/out", "poll_interval": 30,
                "tempo_tool": {"program": "bpm-tag", "args": ["-n"]},
                "title_case": "strict"}"#,
        )
        .unwrap();
        let tool = settings.tempo_tool.unwrap();
        assert_eq!(tool.program, PathBuf::from("bpm-tag"));
        assert_eq!(tool.args, vec!["-n"]);
        assert_eq!(settings.title_case, TitleCase::Strict);
    }
}
