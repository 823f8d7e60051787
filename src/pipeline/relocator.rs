//! Moves a processed file into the destination roots

use std::path::{Path, PathBuf};
use log::{debug, error, info, warn};
use crate::audio::tempo::FlacTool;
use crate::config::Settings;
use crate::utils::file_ops::{with_stem_suffix, FileManager};
use crate::AudioFile;

/// Suffix used when the local destination name is already taken.
pub const COLLISION_SUFFIX: &str = "_1";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// Local copy that exists after the move, primary or suffixed.
    pub local: Option<PathBuf>,
    pub source_deleted: bool,
    pub shared: bool,
}

pub struct Relocator {
    files: FileManager,
    local_root: PathBuf,
    share_root: Option<PathBuf>,
    desktop_root: Option<PathBuf>,
    backup_root: Option<PathBuf>,
    flac_tool: Option<FlacTool>,
}

impl Relocator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            files: FileManager::new(),
            local_root: settings.local_path.clone(),
            share_root: settings.share_root().map(Path::to_path_buf),
            desktop_root: if settings.desktop_copy {
                settings.desktop_path.clone()
            } else {
                None
            },
            backup_root: if settings.backup_before_delete {
                settings.backup_path.clone()
            } else {
                None
            },
            flac_tool: settings.flac_tool.as_ref().map(FlacTool::new),
        }
    }

    /// Copies `file` into the local root under `filename`, removes the source
    /// once that copy succeeded and replicates to the optional roots. Failures
    /// are logged; the source stays in place whenever the copy fails.
    pub fn relocate(&self, file: &AudioFile, filename: &str) -> Relocation {
        let mut relocation = Relocation::default();

        if file.is_flac() {
            self.run_flac_tool(file);
        }

        let primary = self.local_root.join(filename);
        let target = if primary.exists() {
            let alternate = with_stem_suffix(&primary, COLLISION_SUFFIX);
            warn!(
                "{} already exists, copying as: {}",
                primary.display(),
                alternate.file_name().unwrap_or_default().to_string_lossy()
            );
            alternate
        } else {
            primary
        };

        // only a copy made by this call may release the source
        match self.files.copy_no_clobber(&file.path, &target) {
            Ok(_) => {
                info!("Copied: {} -> {}", file.file_name, target.display());
                relocation.source_deleted = self.remove_source(file);
                relocation.local = Some(target);
            }
            Err(e) => warn!(
                "Could not copy {} to {}, leaving the source in place: {}",
                file.file_name,
                target.display(),
                e
            ),
        }

        let replica_source = relocation.local.as_deref().unwrap_or(file.path.as_path());
        if !replica_source.exists() {
            return relocation;
        }

        if let Some(desktop) = &self.desktop_root {
            self.replicate(replica_source, &desktop.join(filename), "desktop");
        }

        if let Some(share) = &self.share_root {
            if share.is_dir() {
                relocation.shared = self.replicate(replica_source, &share.join(filename), "network");
            } else {
                error!(
                    "Network path {} is unavailable, {} was not published to {}",
                    share.display(),
                    file.file_name,
                    share.join(filename).display()
                );
            }
        }

        relocation
    }

    fn run_flac_tool(&self, file: &AudioFile) {
        let Some(tool) = &self.flac_tool else {
            debug!("No flac_tool configured, skipping pre-processing of {}", file.file_name);
            return;
        };
        match tool.run(&file.path) {
            Ok(Some(line)) => info!("FLAC tool: {}", line),
            Ok(None) => info!("FLAC tool finished for {}", file.file_name),
            Err(e) => warn!("FLAC tool failed for {}: {}", file.file_name, e),
        }
    }

    fn remove_source(&self, file: &AudioFile) -> bool {
        if let Some(backup) = &self.backup_root {
            let destination = backup.join(&file.file_name);
            if !destination.exists() {
                if let Err(e) = self.files.copy_no_clobber(&file.path, &destination) {
                    error!(
                        "Backup of {} to {} failed, keeping the source: {}",
                        file.file_name,
                        destination.display(),
                        e
                    );
                    return false;
                }
                debug!("Backed up {} to {}", file.file_name, destination.display());
            }
        }

        match self.files.delete_file(&file.path) {
            Ok(()) => {
                info!("Deleted: {}", file.path.display());
                true
            }
            Err(e) => {
                error!("Error deleting file {}: {}", file.path.display(), e);
                false
            }
        }
    }

    /// Copies to a secondary root unless the name is already present there.
    fn replicate(&self, source: &Path, destination: &Path, label: &str) -> bool {
        if destination.exists() {
            debug!("Already on {}: {}", label, destination.display());
            return true;
        }
        match self.files.copy_no_clobber(source, destination) {
            Ok(_) => {
                info!("Published to {}: {}", label, destination.display());
                true
            }
            Err(e) => {
                error!("Copy to {} {} failed: {}", label, destination.display(), e);
                false
            }
        }
    }
}
