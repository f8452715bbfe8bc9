//! Audio sources, files and separated stems.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::{AudioFormat, StemKind};
use super::ModelError;

/// Where the audio for a job comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AudioSource {
    /// A remote page URL handed to the downloader as-is.
    Remote { url: String },
    /// A file on the local filesystem.
    Local { path: PathBuf },
}

impl AudioSource {
    /// Create a remote source.
    ///
    /// The URL is opaque here; only the download tool validates it.
    pub fn remote(url: impl Into<String>) -> Result<Self, ModelError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ModelError::EmptyUrl);
        }
        Ok(Self::Remote {
            url: url.trim().to_string(),
        })
    }

    /// Create a local source. The file must exist.
    pub fn local(path: impl Into<PathBuf>) -> Result<Self, ModelError> {
        let path = path.into();
        if !path.is_file() {
            return Err(ModelError::LocalFileMissing(path));
        }
        Ok(Self::Local { path })
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// URL or path for display and logging.
    pub fn location(&self) -> String {
        match self {
            Self::Remote { url } => url.clone(),
            Self::Local { path } => path.display().to_string(),
        }
    }
}

/// An audio file produced or consumed by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFile {
    pub path: PathBuf,
    pub format: AudioFormat,
}

impl AudioFile {
    pub fn new(path: impl Into<PathBuf>, format: AudioFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Create from an existing path, inferring the format from its extension.
    ///
    /// Anything but a `.wav` extension (including none) counts as compressed
    /// input that still needs converting.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(AudioFormat::from_extension)
            .unwrap_or(AudioFormat::Mp3);
        Self { path, format }
    }

    /// Base name without extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Whether this file sits directly inside `dir`.
    pub fn is_in_dir(&self, dir: &Path) -> bool {
        match self.parent() {
            Some(parent) => same_dir(parent, dir),
            None => false,
        }
    }
}

/// Compare directories, resolving symlinks and `.` when both exist.
fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Stems produced by the separator. Absent stems are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeparatedAudio {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocals: Option<AudioFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drums: Option<AudioFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bass: Option<AudioFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other: Option<AudioFile>,
}

impl SeparatedAudio {
    pub fn get(&self, kind: StemKind) -> Option<&AudioFile> {
        match kind {
            StemKind::Vocals => self.vocals.as_ref(),
            StemKind::Drums => self.drums.as_ref(),
            StemKind::Bass => self.bass.as_ref(),
            StemKind::Other => self.other.as_ref(),
        }
    }

    pub fn set(&mut self, kind: StemKind, file: Option<AudioFile>) {
        match kind {
            StemKind::Vocals => self.vocals = file,
            StemKind::Drums => self.drums = file,
            StemKind::Bass => self.bass = file,
            StemKind::Other => self.other = file,
        }
    }

    /// All stems that were produced, in canonical order.
    pub fn all_stems(&self) -> Vec<&AudioFile> {
        StemKind::ALL.iter().filter_map(|k| self.get(*k)).collect()
    }

    pub fn stem_count(&self) -> usize {
        self.all_stems().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stem_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn local_source_requires_existing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.mp3");
        assert!(matches!(
            AudioSource::local(&missing),
            Err(ModelError::LocalFileMissing(_))
        ));

        let present = dir.path().join("song.mp3");
        fs::write(&present, b"id3").unwrap();
        let source = AudioSource::local(&present).unwrap();
        assert!(source.is_local());
        assert!(source.location().ends_with("song.mp3"));
    }

    #[test]
    fn remote_source_is_opaque() {
        let source = AudioSource::remote("  https://example.com/v/abc ").unwrap();
        assert!(source.is_remote());
        assert_eq!(source.location(), "https://example.com/v/abc");
        assert!(AudioSource::remote("   ").is_err());
    }

    #[test]
    fn audio_file_derived_attributes() {
        let file = AudioFile::from_path("/music/My Song.MP3");
        assert_eq!(file.format, AudioFormat::Mp3);
        assert_eq!(file.stem(), "My Song");
        assert_eq!(file.file_name(), "My Song.MP3");

        let wav = AudioFile::from_path("/music/take.wav");
        assert_eq!(wav.format, AudioFormat::Wav);
    }

    #[test]
    fn is_in_dir_compares_parent() {
        let dir = tempdir().unwrap();
        let file = AudioFile::new(dir.path().join("a.wav"), AudioFormat::Wav);
        assert!(file.is_in_dir(dir.path()));
        assert!(!file.is_in_dir(&dir.path().join("sub")));
    }

    #[test]
    fn separated_audio_tracks_present_stems() {
        let mut separated = SeparatedAudio::default();
        assert!(separated.is_empty());

        separated.set(
            StemKind::Drums,
            Some(AudioFile::new("/o/htdemucs/s/drums.wav", AudioFormat::Wav)),
        );
        separated.set(
            StemKind::Vocals,
            Some(AudioFile::new("/o/htdemucs/s/vocals.wav", AudioFormat::Wav)),
        );

        assert_eq!(separated.stem_count(), 2);
        // Canonical order, not insertion order
        assert!(separated.all_stems()[0].path.ends_with("vocals.wav"));
        assert!(separated.get(StemKind::Bass).is_none());
    }
}
