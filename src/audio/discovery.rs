//! Discovery of candidate audio files under the watch root

use std::path::Path;
use log::{debug, warn};
use walkdir::WalkDir;
use crate::AudioFile;

/// Walks `root` recursively and returns every file carrying one of the
/// `supported` extensions. Files still being written are included with
/// `is_incomplete` set; callers decide what to skip.
pub fn discover(root: impl AsRef<Path>, supported: &[String]) -> Vec<AudioFile> {
    let root = root.as_ref();

    let mut files: Vec<AudioFile> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Error accessing entry under {}: {}", root.display(), err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let file = AudioFile::from_path(e.path(), supported);
            if file.is_none() {
                debug!("Skipping non-audio file: {}", e.path().display());
            }
            file
        })
        .collect();

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!("Discovered {} audio file(s) under {}", files.len(), root.display());
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn supported() -> Vec<String> {
        vec![".mp3".into(), ".flac".into()]
    }

    #[test]
    fn test_discovers_nested_audio_only() {
        let dir = TempDir::new().unwrap();
        let album = dir.path().join("album");
        fs::create_dir(&album).unwrap();
        fs::write(dir.path().join("b.mp3"), b"x").unwrap();
        fs::write(album.join("a.FLAC"), b"x").unwrap();
        fs::write(album.join("cover.jpg"), b"x").unwrap();
        fs::write(dir.path().join("copiedList.txt"), b"").unwrap();

        let files = discover(dir.path(), &supported());
        let names: Vec<_> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.FLAC", "b.mp3"]);
    }

    #[test]
    fn test_incomplete_files_are_flagged() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("INCOMPLETE~song.mp3"), b"x").unwrap();

        let files = discover(dir.path(), &supported());
        assert_eq!(files.len(), 1);
        assert!(files[0].is_incomplete);
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(discover(dir.path().join("gone"), &supported()).is_empty());
    }
}
