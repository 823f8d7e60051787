use std::path::Path;
use csv::Writer;
use crate::pipeline::orchestrator::PlannedFile;
use crate::Result;

pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    /// One row per file the next pass would relocate.
    pub fn generate_preview_report(&self, planned: &[PlannedFile], output_path: impl AsRef<Path>) -> Result<()> {
        let output_path_ref = output_path.as_ref();
        let mut writer = Writer::from_path(output_path_ref)?;

        writer.write_record(["Source", "Size (bytes)", "Tag Artist", "Tag Title", "Tag BPM", "Output Filename"])?;

        for item in planned {
            let (artist, title, bpm) = match &item.tags {
                Some(tags) => (
                    tags.first_performer().unwrap_or("").to_string(),
                    tags.title_str().to_string(),
                    if tags.bpm > 0 { tags.bpm.to_string() } else { String::new() },
                ),
                None => (String::new(), String::new(), String::new()),
            };

            writer.write_record([
                item.file.path.display().to_string(),
                item.file.size_bytes.to_string(),
                artist,
                title,
                bpm,
                item.output_filename.clone(),
            ])?;
        }

        writer.flush()?;
        log::info!("Preview report generated: {}", output_path_ref.display());
        Ok(())
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use crate::audio::tags::TagSet;
    use crate::AudioFile;

    #[test]
    fn test_preview_report_rows() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("preview.csv");
        let planned = vec![PlannedFile {
            file: AudioFile {
                path: PathBuf::from("/in/01_a--b.mp3"),
                file_name: "01_a--b.mp3".into(),
                extension: ".mp3".into(),
                size_bytes: 42,
                is_incomplete: false,
            },
            tags: Some(TagSet {
                performers: vec!["A".into()],
                bpm: 120,
                ..TagSet::default()
            }),
            output_filename: "A - B.mp3".into(),
        }];

        Reporter::new().generate_preview_report(&planned, &report).unwrap();

        let text = fs::read_to_string(&report).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Source,Size (bytes),Tag Artist,Tag Title,Tag BPM,Output Filename")
        );
        assert_eq!(lines.next(), Some("/in/01_a--b.mp3,42,A,,120,A - B.mp3"));
    }
}
