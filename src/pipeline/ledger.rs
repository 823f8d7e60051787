//! Append-only record of every audio path the service has seen

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use log::debug;
use crate::{AudioFile, Result};

pub const LEDGER_FILE_NAME: &str = "copiedList.txt";

/// In-memory view of the ledger file. Entries are only ever appended.
pub struct Ledger {
    path: PathBuf,
    entries: HashSet<String>,
}

impl Ledger {
    /// Creates the ledger file when missing and loads every line.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            OpenOptions::new().create(true).append(true).open(&path)?;
            debug!("Created ledger {}", path.display());
        }

        let entries = fs::read_to_string(&path)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains(path.to_string_lossy().as_ref())
    }

    /// Appends every complete file not recorded yet. Returns how many lines
    /// were written.
    pub fn record_if_new(&mut self, files: &[AudioFile]) -> Result<usize> {
        let fresh: Vec<String> = files
            .iter()
            .filter(|f| !f.is_incomplete)
            .map(|f| f.path.to_string_lossy().into_owned())
            .filter(|p| !self.entries.contains(p))
            .collect();

        if fresh.is_empty() {
            return Ok(0);
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = BufWriter::new(file);
        let mut written = 0;
        for entry in fresh {
            // the same path can appear twice in one batch
            if self.entries.insert(entry.clone()) {
                writeln!(writer, "{}", entry)?;
                written += 1;
            }
        }
        writer.flush()?;
        Ok(written)
    }
}
