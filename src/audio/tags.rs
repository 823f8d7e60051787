//! Tag access: the `TagSet` view and the stores that read and persist it

use std::path::Path;
use lofty::config::WriteOptions;
use lofty::file::{AudioFile as _, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, ItemValue, Tag, TagItem};
use crate::{AudioError, Result};

/// Mutable view of the tag fields the pipeline cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    pub title: Option<String>,
    /// First entry is the primary artist. "No artist" is `[""]` once resolved.
    pub performers: Vec<String>,
    /// 0 means not set
    pub bpm: u32,
    pub album_artists: Vec<String>,
    pub composers: Vec<String>,
    pub comment: Option<String>,
    pub grouping: Option<String>,
}

impl TagSet {
    pub fn first_performer(&self) -> Option<&str> {
        self.performers.first().map(String::as_str)
    }

    pub fn title_str(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Empties album-artist, composer, comment and grouping.
    pub fn clear_credits(&mut self) {
        self.album_artists.clear();
        self.composers.clear();
        self.comment = Some(String::new());
        self.grouping = Some(String::new());
    }
}

/// Reads and persists tags for one audio file at a time.
pub trait TagStore {
    fn read(&self, path: &Path) -> Result<TagSet>;

    fn write(&self, path: &Path, tags: &TagSet) -> Result<()>;
}

/// `TagStore` backed by lofty; writes go to the file's primary tag format.
pub struct LoftyTagStore;

impl LoftyTagStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoftyTagStore {
    fn default() -> Self {
        Self::new()
    }
}

fn tag_error(path: &Path, e: impl std::fmt::Display) -> AudioError {
    AudioError::Tag(format!("{}: {}", path.display(), e))
}

fn parse_bpm(raw: &str) -> u32 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.round().min(u32::MAX as f64) as u32)
        .unwrap_or(0)
}

impl TagStore for LoftyTagStore {
    fn read(&self, path: &Path) -> Result<TagSet> {
        let tagged_file = Probe::open(path)
            .map_err(|e| tag_error(path, e))?
            .read()
            .map_err(|e| tag_error(path, e))?;

        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            return Ok(TagSet::default());
        };

        Ok(TagSet {
            title: tag.title().map(|t| t.into_owned()),
            performers: tag.get_strings(&ItemKey::TrackArtist).map(String::from).collect(),
            bpm: tag.get_string(&ItemKey::Bpm).map(parse_bpm).unwrap_or(0),
            album_artists: tag.get_strings(&ItemKey::AlbumArtist).map(String::from).collect(),
            composers: tag.get_strings(&ItemKey::Composer).map(String::from).collect(),
            comment: tag.comment().map(|c| c.into_owned()),
            grouping: tag.get_string(&ItemKey::ContentGroup).map(String::from),
        })
    }

    fn write(&self, path: &Path, tags: &TagSet) -> Result<()> {
        let mut tagged_file = Probe::open(path)
            .map_err(|e| tag_error(path, e))?
            .read()
            .map_err(|e| tag_error(path, e))?;

        if tagged_file.primary_tag().is_none() {
            let tag_type = tagged_file.primary_tag_type();
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .primary_tag_mut()
            .ok_or_else(|| tag_error(path, "no writable tag"))?;

        match tags.title.as_deref() {
            Some(title) if !title.is_empty() => tag.set_title(title.to_string()),
            _ => tag.remove_title(),
        }

        tag.remove_key(&ItemKey::TrackArtist);
        for performer in tags.performers.iter().filter(|p| !p.is_empty()) {
            tag.push(TagItem::new(ItemKey::TrackArtist, ItemValue::Text(performer.clone())));
        }

        if tags.bpm > 0 {
            tag.insert_text(ItemKey::Bpm, tags.bpm.to_string());
        } else {
            tag.remove_key(&ItemKey::Bpm);
        }

        replace_all(tag, ItemKey::AlbumArtist, &tags.album_artists);
        replace_all(tag, ItemKey::Composer, &tags.composers);

        match tags.comment.as_deref() {
            Some(comment) if !comment.is_empty() => tag.set_comment(comment.to_string()),
            _ => tag.remove_comment(),
        }
        match tags.grouping.as_deref() {
            Some(grouping) if !grouping.is_empty() => {
                tag.insert_text(ItemKey::ContentGroup, grouping.to_string());
            }
            _ => {
                tag.remove_key(&ItemKey::ContentGroup);
            }
        }

        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| tag_error(path, e))?;
        log::debug!("Saved tags for {}", path.display());
        Ok(())
    }
}

fn replace_all(tag: &mut Tag, key: ItemKey, values: &[String]) {
    tag.remove_key(&key);
    for value in values.iter().filter(|v| !v.is_empty()) {
        tag.push(TagItem::new(key.clone(), ItemValue::Text(value.clone())));
    }
}
