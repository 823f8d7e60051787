//! Removal of stray files and emptied folders directly under the watch root

use std::fs;
use std::path::Path;
use log::{debug, error, info, warn};
use crate::INCOMPLETE_MARKER;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeReport {
    pub files_removed: usize,
    pub dirs_removed: usize,
}

pub struct Sanitizer {
    /// Lowercased suffixes that survive, e.g. ".mp3"
    keep_suffixes: Vec<String>,
}

impl Sanitizer {
    pub fn new(keep_suffixes: &[String]) -> Self {
        Self {
            keep_suffixes: keep_suffixes.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    fn keeps(&self, file_name: &str) -> bool {
        if file_name.contains(INCOMPLETE_MARKER) {
            return true;
        }
        let lowered = file_name.to_lowercase();
        self.keep_suffixes.iter().any(|s| lowered.ends_with(s.as_str()))
    }

    /// For each immediate subdirectory of `root`, deletes files that are
    /// neither kept suffixes nor incomplete downloads, then removes the
    /// subdirectory if nothing is left. Subdirectories marked incomplete are
    /// skipped whole. Best effort: failures are logged.
    pub fn sanitize(&self, root: &Path) -> SanitizeReport {
        let mut report = SanitizeReport::default();

        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error reading {} for cleanup: {}", root.display(), e);
                return report;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error reading entry in {}: {}", root.display(), e);
                    continue;
                }
            };
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            if entry.file_name().to_string_lossy().contains(INCOMPLETE_MARKER) {
                debug!("Skipping incomplete download folder: {}", dir.display());
                continue;
            }
            self.sanitize_dir(&dir, &mut report);
        }

        report
    }

    fn sanitize_dir(&self, dir: &Path, report: &mut SanitizeReport) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error reading {} for cleanup: {}", dir.display(), e);
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error reading entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.keeps(&name) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!("Removed non-audio file: {}", path.display());
                    report.files_removed += 1;
                }
                Err(e) => error!("Error removing file {}: {}", path.display(), e),
            }
        }

        let is_empty = match fs::read_dir(dir) {
            Ok(mut rest) => rest.next().is_none(),
            Err(e) => {
                warn!("Cannot re-read {}: {}", dir.display(), e);
                false
            }
        };
        if is_empty {
            match fs::remove_dir(dir) {
                Ok(()) => {
                    info!("Removed empty directory: {}", dir.display());
                    report.dirs_removed += 1;
                }
                Err(e) => error!("Error removing directory {}: {}", dir.display(), e),
            }
        }
    }
}
