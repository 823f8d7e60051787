use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use log::info;
use crate::Result;

pub struct FileManager;

impl FileManager {
    pub fn new() -> Self {
        Self
    }

    /// Copies `source` to `destination` without ever replacing an existing file.
    /// Fails with `AlreadyExists` when the destination is taken.
    pub fn copy_no_clobber(&self, source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<u64> {
        let source = source.as_ref();
        let destination = destination.as_ref();

        let mut reader = File::open(source)?;
        let mut writer = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)?;

        let copied = match io::copy(&mut reader, &mut writer) {
            Ok(n) => n,
            Err(e) => {
                drop(writer);
                let _ = fs::remove_file(destination);
                return Err(e.into());
            }
        };
        writer.sync_all()?;

        if let Ok(modified) = fs::metadata(source).and_then(|m| m.modified()) {
            let _ = writer.set_modified(modified);
        }

        Ok(copied)
    }

    pub fn delete_file(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::remove_file(path.as_ref())?;
        Ok(())
    }

    /// Creates `path` (and parents) when missing; returns true if it was created.
    pub fn ensure_directory(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if path.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(path)?;
        info!("Creating... {}", path.display());
        Ok(true)
    }
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new()
    }
}

/// `dir/name.ext` becomes `dir/name{suffix}.ext`.
pub fn with_stem_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    path.with_file_name(name)
}
