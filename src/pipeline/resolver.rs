//! Tag resolution: decides the final artist, title and BPM of a file
//!
//! Priority: trusted tag values first, then the tempo tool for BPM, then the
//! normalized filename ("Artist - Title") for artist and title.

use std::path::Path;
use log::{info, warn};
use crate::audio::tags::{TagSet, TagStore};
use crate::audio::tempo::{round_bpm, TempoEstimator};
use crate::config::BpmRange;
use crate::{AudioFile, Result};

/// Outcome of resolving one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub tags: TagSet,
    /// Artist and title taken as-is from existing tags, when both were usable.
    pub tag_pair: Option<(String, String)>,
    /// Whether anything had to be written back to the file.
    pub changed: bool,
}

pub struct TagResolver {
    store: Box<dyn TagStore>,
    estimator: Box<dyn TempoEstimator>,
    bpm_range: BpmRange,
    correct_octave: bool,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The existing artist/title pair when both are usable as they are: a
/// non-empty first performer and a title longer than two characters.
pub fn trusted_pair(tags: &TagSet, title: Option<&str>) -> Option<(String, String)> {
    let artist = tags.first_performer().filter(|a| !a.is_empty())?;
    let title = title.filter(|t| char_len(t) > 2)?;
    Some((artist.to_string(), title.to_string()))
}

impl TagResolver {
    pub fn new(
        store: Box<dyn TagStore>,
        estimator: Box<dyn TempoEstimator>,
        bpm_range: BpmRange,
        correct_octave: bool,
    ) -> Self {
        Self {
            store,
            estimator,
            bpm_range,
            correct_octave,
        }
    }

    pub fn store(&self) -> &dyn TagStore {
        self.store.as_ref()
    }

    /// Reads the file's tags, resolves them against `candidate_stem` (the
    /// normalized filename without extension) and persists any change.
    pub fn resolve(&self, file: &AudioFile, candidate_stem: &str) -> Result<Resolution> {
        let mut tags = self.store.read(&file.path)?;
        let (tag_pair, changed) = self.resolve_tags(&file.path, &mut tags, candidate_stem);

        if changed {
            self.store.write(&file.path, &tags)?;
        }

        Ok(Resolution {
            tags,
            tag_pair,
            changed,
        })
    }

    fn resolve_tags(
        &self,
        path: &Path,
        tags: &mut TagSet,
        candidate_stem: &str,
    ) -> (Option<(String, String)>, bool) {
        let mut changed = self.resolve_bpm(path, tags);

        // Title: only a value longer than one character is trusted
        let canonical_title = tags.title.clone().filter(|t| char_len(t) > 1);
        if canonical_title.is_none() {
            if tags.title.as_deref() != Some("") {
                changed = true;
            }
            tags.title = Some(String::new());
        }

        // Performers: "no artist" is a single empty entry
        if tags.first_performer().map_or(true, str::is_empty) && tags.performers != [""] {
            tags.performers = vec![String::new()];
            changed = true;
        }

        let tag_pair = trusted_pair(tags, canonical_title.as_deref());
        match &tag_pair {
            Some((artist, title)) => {
                info!("ID3 Artist: [{}]", artist);
                info!("ID3 Title: [{}]", title);
                info!("Tag data OK");
            }
            None => info!("Tag data missing..."),
        }

        if tags.performers[0].is_empty() {
            if let Some((before, _)) = candidate_stem.split_once('-') {
                let artist = before.trim();
                if !artist.is_empty() {
                    info!("Set artist from filename: '{}'", artist);
                    tags.performers = vec![artist.to_string()];
                    changed = true;
                }
            }
        }

        if canonical_title.as_deref().map_or(true, |t| char_len(t) < 2) {
            tags.title = Some(String::new());
            if let Some((_, after)) = candidate_stem.split_once('-') {
                let title = after.trim();
                info!("Set title from filename: '{}'", title);
                tags.title = Some(title.to_string());
            }
            tags.clear_credits();
            changed = true;
        }

        (tag_pair, changed)
    }

    /// Returns true when a new BPM was written into `tags`.
    fn resolve_bpm(&self, path: &Path, tags: &mut TagSet) -> bool {
        let existing = tags.bpm;
        // 0 means unset and a single digit is not a real tempo
        let is_set = existing.to_string().len() > 1;

        if is_set && self.bpm_range.contains(existing) {
            info!("ID3 BPM: {}", existing);
            info!("Tag BPM OK");
            return false;
        }
        if is_set {
            warn!(
                "Tag BPM out of range: {} (expected {}-{}), leaving it unchanged",
                existing, self.bpm_range.min, self.bpm_range.max
            );
            return false;
        }

        info!("Tag BPM missing or invalid, detecting with {}...", self.estimator.name());
        let tempo = match self.estimator.estimate_tempo(path) {
            Ok(tempo) => tempo,
            Err(e) => {
                warn!("BPM detection failed for {}: {}", path.display(), e);
                return false;
            }
        };

        let detected = round_bpm(tempo);
        let bpm = if self.correct_octave {
            self.fold_octave(detected)
        } else {
            detected
        };
        if bpm == 0 {
            warn!("Tempo tool reported {} for {}, not tagging", tempo, path.display());
            return false;
        }

        info!("BPM Detected: {}", tempo);
        info!("Setting new BPM: [{}]", bpm);
        tags.bpm = bpm;
        true
    }

    /// Halves or doubles a tempo that falls outside the configured range.
    fn fold_octave(&self, bpm: u32) -> u32 {
        if self.bpm_range.contains(bpm) {
            return bpm;
        }
        let half = bpm / 2;
        if self.bpm_range.contains(half) {
            info!("Corrected BPM from {} to {} (half-time)", bpm, half);
            return half;
        }
        let double = bpm.saturating_mul(2);
        if self.bpm_range.contains(double) {
            info!("Corrected BPM from {} to {} (double-time)", bpm, double);
            return double;
        }
        bpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::rc::Rc;
    use pretty_assertions::assert_eq;
    use crate::AudioError;

    #[derive(Clone, Default)]
    struct MemoryStore {
        tags: Rc<RefCell<HashMap<PathBuf, TagSet>>>,
        writes: Rc<Cell<usize>>,
    }

    impl TagStore for MemoryStore {
        fn read(&self, path: &Path) -> Result<TagSet> {
            Ok(self.tags.borrow().get(path).cloned().unwrap_or_default())
        }

        fn write(&self, path: &Path, tags: &TagSet) -> Result<()> {
            self.writes.set(self.writes.get() + 1);
            self.tags.borrow_mut().insert(path.to_path_buf(), tags.clone());
            Ok(())
        }
    }

    struct FixedTempo {
        tempo: Option<f64>,
        calls: Rc<Cell<usize>>,
    }

    impl TempoEstimator for FixedTempo {
        fn estimate_tempo(&self, _path: &Path) -> Result<f64> {
            self.calls.set(self.calls.get() + 1);
            self.tempo.ok_or_else(|| AudioError::Tempo("tool failed".into()))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Fixture {
        resolver: TagResolver,
        store: MemoryStore,
        calls: Rc<Cell<usize>>,
        file: AudioFile,
    }

    fn fixture(existing: TagSet, tempo: Option<f64>, correct_octave: bool) -> Fixture {
        let file = AudioFile {
            path: PathBuf::from("/in/01_dj_mix--club_anthem.mp3"),
            file_name: "01_dj_mix--club_anthem.mp3".into(),
            extension: ".mp3".into(),
            size_bytes: 0,
            is_incomplete: false,
        };
        let store = MemoryStore::default();
        store.tags.borrow_mut().insert(file.path.clone(), existing);
        let calls = Rc::new(Cell::new(0));
        let resolver = TagResolver::new(
            Box::new(store.clone()),
            Box::new(FixedTempo { tempo, calls: calls.clone() }),
            BpmRange::default(),
            correct_octave,
        );
        Fixture { resolver, store, calls, file }
    }

    fn tagged(artist: &str, title: &str, bpm: u32) -> TagSet {
        TagSet {
            title: Some(title.into()),
            performers: vec![artist.into()],
            bpm,
            ..TagSet::default()
        }
    }

    #[test]
    fn test_untagged_file_takes_everything_from_filename() {
        let f = fixture(TagSet::default(), Some(128.4), false);
        let resolution = f.resolver.resolve(&f.file, "Dj Mix - Club Anthem").unwrap();

        assert_eq!(resolution.tags.bpm, 128);
        assert_eq!(resolution.tags.performers, vec!["Dj Mix"]);
        assert_eq!(resolution.tags.title.as_deref(), Some("Club Anthem"));
        assert_eq!(resolution.tag_pair, None);
        assert!(resolution.changed);
        assert_eq!(f.store.writes.get(), 1);
        assert_eq!(f.store.read(&f.file.path).unwrap(), resolution.tags);
    }

    #[test]
    fn test_good_tags_are_kept_and_not_rewritten() {
        let f = fixture(tagged("Artist", "Song Name", 70), Some(140.0), false);
        let resolution = f.resolver.resolve(&f.file, "Other - Thing").unwrap();

        assert_eq!(resolution.tags.bpm, 70);
        assert_eq!(resolution.tag_pair, Some(("Artist".into(), "Song Name".into())));
        assert!(!resolution.changed);
        assert_eq!(f.store.writes.get(), 0);
        assert_eq!(f.calls.get(), 0);
    }

    #[test]
    fn test_out_of_range_bpm_is_left_alone() {
        let f = fixture(tagged("Artist", "Song Name", 200), Some(128.0), false);
        let resolution = f.resolver.resolve(&f.file, "Artist - Song Name").unwrap();

        assert_eq!(resolution.tags.bpm, 200);
        assert_eq!(f.calls.get(), 0);
    }

    #[test]
    fn test_single_digit_bpm_is_replaced() {
        let f = fixture(tagged("Artist", "Song Name", 9), Some(99.6), false);
        let resolution = f.resolver.resolve(&f.file, "Artist - Song Name").unwrap();
        assert_eq!(resolution.tags.bpm, 100);
    }

    #[test]
    fn test_tool_failure_leaves_bpm_unset() {
        let f = fixture(tagged("Artist", "Song Name", 0), None, false);
        let resolution = f.resolver.resolve(&f.file, "Artist - Song Name").unwrap();
        assert_eq!(resolution.tags.bpm, 0);
        assert!(!resolution.changed);
    }

    #[test]
    fn test_octave_correction() {
        let f = fixture(tagged("Artist", "Song Name", 0), Some(256.0), true);
        assert_eq!(f.resolver.resolve(&f.file, "a - b").unwrap().tags.bpm, 128);

        let f = fixture(tagged("Artist", "Song Name", 0), Some(256.0), false);
        assert_eq!(f.resolver.resolve(&f.file, "a - b").unwrap().tags.bpm, 256);
    }

    #[test]
    fn test_missing_artist_derived_but_title_kept() {
        let f = fixture(tagged("", "Real Title", 120), None, false);
        let resolution = f.resolver.resolve(&f.file, "Some Artist - Wrong Title").unwrap();

        assert_eq!(resolution.tags.performers, vec!["Some Artist"]);
        assert_eq!(resolution.tags.title.as_deref(), Some("Real Title"));
        assert_eq!(resolution.tag_pair, None);
    }

    #[test]
    fn test_short_title_falls_back_and_clears_credits() {
        let mut existing = tagged("Artist", "x", 120);
        existing.comment = Some("visit our site".into());
        existing.album_artists = vec!["Various".into()];
        let f = fixture(existing, None, false);

        let resolution = f.resolver.resolve(&f.file, "Artist - Full Title").unwrap();

        assert_eq!(resolution.tags.title.as_deref(), Some("Full Title"));
        assert_eq!(resolution.tags.performers, vec!["Artist"]);
        assert_eq!(resolution.tags.comment.as_deref(), Some(""));
        assert!(resolution.tags.album_artists.is_empty());
    }

    #[test]
    fn test_no_dash_leaves_empty_artist_and_title() {
        let f = fixture(TagSet::default(), None, false);
        let resolution = f.resolver.resolve(&f.file, "Untitled Track").unwrap();

        assert_eq!(resolution.tags.performers, vec![""]);
        assert_eq!(resolution.tags.title.as_deref(), Some(""));
    }

    #[test]
    fn test_missing_performers_are_initialized_and_persisted() {
        let existing = TagSet {
            title: Some("Song Name".into()),
            bpm: 120,
            ..TagSet::default()
        };
        let f = fixture(existing, None, false);

        let resolution = f.resolver.resolve(&f.file, "Untitled Track").unwrap();

        assert_eq!(resolution.tags.performers, vec![""]);
        assert!(resolution.changed);
        assert_eq!(f.store.writes.get(), 1);
    }
}
