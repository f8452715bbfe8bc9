//! Core enums used throughout the application.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ModelError;

/// Audio container/codec pair understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Uncompressed PCM WAV (the canonical format).
    #[default]
    Wav,
    /// Lossy MP3.
    Mp3,
}

impl AudioFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    /// Infer the format of an existing file from its extension.
    ///
    /// Anything that is not `.wav` is treated as needing conversion, which
    /// the pipeline models as MP3.
    pub fn from_extension(ext: &str) -> Self {
        if ext.eq_ignore_ascii_case("wav") {
            AudioFormat::Wav
        } else {
            AudioFormat::Mp3
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            other => Err(ModelError::UnknownFormat(other.to_string())),
        }
    }
}

/// One isolated stem produced by source separation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemKind {
    Vocals,
    Drums,
    Bass,
    Other,
}

impl StemKind {
    /// All stems in the order the separator writes them.
    pub const ALL: [StemKind; 4] = [
        StemKind::Vocals,
        StemKind::Drums,
        StemKind::Bass,
        StemKind::Other,
    ];

    /// Stem name as used in output file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            StemKind::Vocals => "vocals",
            StemKind::Drums => "drums",
            StemKind::Bass => "bass",
            StemKind::Other => "other",
        }
    }

    /// File name of this stem inside the separator's track directory.
    pub fn file_name(&self) -> String {
        format!("{}.wav", self.as_str())
    }
}

impl std::fmt::Display for StemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a processing job.
///
/// The progression is linear with two absorbing exits (`Completed`,
/// `Failed`) and one cooperative exit (`Cancelled`). No stage can be
/// re-entered; see [`ProcessingStatus::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Downloading,
    Converting,
    Splitting,
    Completed,
    Failed,
    Cancelled,
}

impl ProcessingStatus {
    /// Lowercase label used in progress reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Converting => "converting",
            Self::Splitting => "splitting",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Allowed-transition table.
    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;
        match (self, next) {
            (Pending, Downloading | Converting | Failed | Cancelled) => true,
            (Downloading, Converting | Failed | Cancelled) => true,
            (Converting, Splitting | Completed | Failed | Cancelled) => true,
            (Splitting, Completed | Failed | Cancelled) => true,
            _ => false,
        }
    }

    /// Check a transition against the table.
    pub fn check_transition(&self, next: ProcessingStatus) -> Result<(), ModelError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(ModelError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension_is_case_insensitive() {
        assert_eq!(AudioFormat::from_extension("WAV"), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_extension("wav"), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_extension("mp3"), AudioFormat::Mp3);
        // Anything else needs conversion
        assert_eq!(AudioFormat::from_extension("flac"), AudioFormat::Mp3);
    }

    #[test]
    fn format_parses_from_str() {
        assert_eq!("wav".parse::<AudioFormat>().unwrap(), AudioFormat::Wav);
        assert_eq!(" MP3 ".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert!("ogg".parse::<AudioFormat>().is_err());
    }

    #[test]
    fn remote_progression_is_allowed() {
        use ProcessingStatus::*;
        let path = [Pending, Downloading, Converting, Splitting, Completed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn local_progression_skips_download() {
        use ProcessingStatus::*;
        assert!(Pending.can_transition_to(Converting));
        assert!(Converting.can_transition_to(Completed));
    }

    #[test]
    fn terminal_states_are_absorbing() {
        use ProcessingStatus::*;
        for terminal in [Completed, Failed, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [Pending, Downloading, Converting, Splitting, Completed, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn stages_cannot_be_reentered() {
        use ProcessingStatus::*;
        assert!(!Converting.can_transition_to(Downloading));
        assert!(!Splitting.can_transition_to(Converting));
        assert!(!Downloading.can_transition_to(Downloading));

        let err = Completed.check_transition(Downloading).unwrap_err();
        assert!(err.to_string().contains("completed"));
        assert!(err.to_string().contains("downloading"));
    }

    #[test]
    fn stem_file_names() {
        let names: Vec<String> = StemKind::ALL.iter().map(|s| s.file_name()).collect();
        assert_eq!(names, ["vocals.wav", "drums.wav", "bass.wav", "other.wav"]);
    }
}
