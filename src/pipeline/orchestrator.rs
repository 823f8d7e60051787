//! One processing pass over the watch root
//!
//! sanitize -> discover -> ledger -> (resolve tags, name, relocate) per file.
//! Per-file errors never abort the pass.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use log::{debug, error, info, warn};
use crate::audio::discovery::discover;
use crate::audio::tags::{LoftyTagStore, TagSet, TagStore};
use crate::audio::tempo::{CommandTempoEstimator, DisabledTempoEstimator, TempoEstimator};
use crate::config::Settings;
use crate::pipeline::ledger::Ledger;
use crate::pipeline::normalizer::FilenameNormalizer;
use crate::pipeline::relocator::{Relocation, Relocator};
use crate::pipeline::resolver::{trusted_pair, TagResolver};
use crate::pipeline::sanitizer::{SanitizeReport, Sanitizer};
use crate::utils::file_ops::FileManager;
use crate::{AudioFile, Result};

const RULE: &str = "===============================================================";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub sanitized: SanitizeReport,
    pub discovered: usize,
    pub ledger_added: usize,
    pub incomplete: usize,
    /// Still growing; retried next pass
    pub deferred: usize,
    pub relocated: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStatus {
    pub label: &'static str,
    pub path: PathBuf,
    pub exists: bool,
}

/// Read-only snapshot of the configured roots and the watch folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub paths: Vec<PathStatus>,
    /// Complete files the next pass would pick up
    pub pending: usize,
    pub incomplete: usize,
    pub log_file_size: Option<u64>,
}

/// What a file would become, without touching it.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub file: AudioFile,
    pub tags: Option<TagSet>,
    pub output_filename: String,
}

pub struct Orchestrator {
    settings: Settings,
    files: FileManager,
    normalizer: FilenameNormalizer,
    resolver: TagResolver,
    sanitizer: Sanitizer,
    relocator: Relocator,
}

impl Orchestrator {
    pub fn new(
        settings: Settings,
        store: Box<dyn TagStore>,
        estimator: Box<dyn TempoEstimator>,
    ) -> Self {
        Self {
            files: FileManager::new(),
            normalizer: FilenameNormalizer::new(settings.title_case),
            resolver: TagResolver::new(
                store,
                estimator,
                settings.bpm_range,
                settings.correct_tempo_octave,
            ),
            sanitizer: Sanitizer::new(&settings.sanitize_keep_extensions),
            relocator: Relocator::new(&settings),
            settings,
        }
    }

    /// Lofty for tags and the configured tempo tool, if any.
    pub fn from_settings(settings: Settings) -> Self {
        let estimator: Box<dyn TempoEstimator> = match &settings.tempo_tool {
            Some(tool) => Box::new(CommandTempoEstimator::new(tool)),
            None => {
                warn!("No tempo_tool configured, BPM detection is disabled");
                Box::new(DisabledTempoEstimator)
            }
        };
        Self::new(settings, Box::new(LoftyTagStore::new()), estimator)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Creates every directory the pipeline writes to.
    pub fn prepare(&self) -> Result<()> {
        let mut directories: Vec<&PathBuf> = vec![&self.settings.base_path, &self.settings.local_path];
        if let Some(desktop) = &self.settings.desktop_path {
            directories.push(desktop);
        }
        if self.settings.include_share {
            if let Some(network) = &self.settings.network_path {
                directories.push(network);
            }
        }
        if self.settings.backup_before_delete {
            if let Some(backup) = &self.settings.backup_path {
                directories.push(backup);
            }
        }

        for directory in directories {
            self.files.ensure_directory(directory)?;
        }
        Ok(())
    }

    pub fn run_pass(&self) -> PassReport {
        info!("");
        info!("{}", RULE);
        info!("Starting audio file processing...");
        info!("{}", RULE);

        let mut report = PassReport {
            sanitized: self.sanitizer.sanitize(&self.settings.base_path),
            ..PassReport::default()
        };

        let files = discover(&self.settings.base_path, &self.settings.supported_extensions);
        report.discovered = files.len();
        info!("Found {} audio file(s) to process", files.len());

        match Ledger::open(self.settings.ledger_path()).and_then(|mut l| l.record_if_new(&files)) {
            Ok(added) => report.ledger_added = added,
            Err(e) => error!("Error updating ledger {}: {}", self.settings.ledger_path().display(), e),
        }

        let (incomplete, complete): (Vec<_>, Vec<_>) = files.into_iter().partition(|f| f.is_incomplete);
        report.incomplete = incomplete.len();
        for file in &incomplete {
            debug!("Skipping incomplete download: {}", file.path.display());
        }

        let (ready, deferred) = self.split_stable(complete);
        report.deferred = deferred;

        for file in &ready {
            let relocation = self.process_file(file);
            if relocation.local.is_some() && relocation.source_deleted {
                report.relocated += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            "Pass complete: {} discovered, {} relocated, {} deferred, {} incomplete, {} failed",
            report.discovered, report.relocated, report.deferred, report.incomplete, report.failed
        );
        report
    }

    /// Waits `file_stability_wait` once for the whole batch and holds back
    /// files whose size moved in the meantime.
    fn split_stable(&self, files: Vec<AudioFile>) -> (Vec<AudioFile>, usize) {
        if self.settings.file_stability_wait == 0 || files.is_empty() {
            return (files, 0);
        }

        let before: HashMap<PathBuf, u64> =
            files.iter().map(|f| (f.path.clone(), f.size_bytes)).collect();
        thread::sleep(Duration::from_secs(self.settings.file_stability_wait));

        let mut deferred = 0;
        let ready = files
            .into_iter()
            .filter(|f| {
                let now = fs::metadata(&f.path).map(|m| m.len()).ok();
                let stable = now.is_some() && now == before.get(&f.path).copied();
                if !stable {
                    info!("File still changing, deferring: {}", f.file_name);
                    deferred += 1;
                }
                stable
            })
            .collect();
        (ready, deferred)
    }

    /// Resolves tags, names and relocates one complete file.
    pub fn process_file(&self, file: &AudioFile) -> Relocation {
        info!("");
        info!("---------------------------------------------------------------");
        info!("PROCESSING: {}", file.file_name);

        let candidate = self.normalizer.normalize_stem(file.stem());
        let filename = match self.resolver.resolve(file, &candidate) {
            Ok(resolution) => self.output_filename(file, &candidate, resolution.tag_pair.as_ref()),
            Err(e) => {
                error!("Error processing tags of {}: {}", file.path.display(), e);
                format!("{}{}", candidate, file.extension)
            }
        };
        info!("New filename: {}", filename);

        self.relocator.relocate(file, &filename)
    }

    fn output_filename(
        &self,
        file: &AudioFile,
        candidate: &str,
        tag_pair: Option<&(String, String)>,
    ) -> String {
        match tag_pair {
            Some((artist, _)) if artist.contains('.') => {
                info!("Using original filename as Artist tag contains '.'");
            }
            Some((artist, title)) => {
                return self
                    .normalizer
                    .normalize(&format!("{} - {}", artist, title), &file.extension);
            }
            None => {}
        }
        format!("{}{}", candidate, file.extension)
    }

    /// Dry run over the watch root: reads tags but changes nothing.
    pub fn plan(&self) -> Vec<PlannedFile> {
        discover(&self.settings.base_path, &self.settings.supported_extensions)
            .into_iter()
            .filter(|f| !f.is_incomplete)
            .map(|file| {
                let candidate = self.normalizer.normalize_stem(file.stem());
                let tags = match self.resolver.store().read(&file.path) {
                    Ok(tags) => Some(tags),
                    Err(e) => {
                        warn!("Cannot read tags of {}: {}", file.file_name, e);
                        None
                    }
                };
                let pair = tags
                    .as_ref()
                    .and_then(|t| trusted_pair(t, t.title.as_deref()));
                let output_filename = self.output_filename(&file, &candidate, pair.as_ref());
                PlannedFile { file, tags, output_filename }
            })
            .collect()
    }

    /// Which roots exist and how much is waiting, without creating or
    /// changing anything.
    pub fn status(&self) -> StatusReport {
        let settings = &self.settings;
        let mut roots: Vec<(&'static str, &Path)> = vec![
            ("Base Path", settings.base_path.as_path()),
            ("Local Path", settings.local_path.as_path()),
        ];
        if let Some(network) = settings.share_root() {
            roots.push(("Network Path", network));
        }
        if settings.desktop_copy {
            if let Some(desktop) = &settings.desktop_path {
                roots.push(("Desktop Path", desktop.as_path()));
            }
        }
        if settings.backup_before_delete {
            if let Some(backup) = &settings.backup_path {
                roots.push(("Backup Path", backup.as_path()));
            }
        }

        let paths = roots
            .into_iter()
            .map(|(label, path)| PathStatus {
                label,
                path: path.to_path_buf(),
                exists: path.is_dir(),
            })
            .collect();

        let files = discover(&settings.base_path, &settings.supported_extensions);
        let incomplete = files.iter().filter(|f| f.is_incomplete).count();

        StatusReport {
            paths,
            pending: files.len() - incomplete,
            incomplete,
            log_file_size: settings
                .log_file
                .as_ref()
                .and_then(|path| fs::metadata(path).ok())
                .map(|meta| meta.len()),
        }
    }
}
