//! The three processing stages and the tool-backed implementations.
//!
//! Each stage is a trait so the orchestrator can be driven by in-memory
//! doubles in tests. Every call takes the job's [`CancelToken`] and logger
//! explicitly.

mod converter;
mod downloader;
mod separator;

use std::path::{Path, PathBuf};

use crate::logging::JobLogger;
use crate::models::{AudioFile, AudioFormat, AudioSource, SeparatedAudio};
use crate::orchestrator::{CancelToken, StepResult};

pub use converter::FfmpegConverter;
pub use downloader::{FileWait, YtDlpDownloader};
pub use separator::{locate_stems, parse_progress_percent, stem_directory, DemucsSeparator};

/// Fetches the audio of a remote source into a directory.
pub trait AudioDownloader: Send + Sync {
    fn download(
        &self,
        source: &AudioSource,
        output_dir: &Path,
        format: AudioFormat,
        cancel: &CancelToken,
        logger: &JobLogger,
    ) -> StepResult<AudioFile>;
}

/// Re-encodes an audio file into a target format.
pub trait AudioConverter: Send + Sync {
    fn convert(
        &self,
        input: &AudioFile,
        output_dir: &Path,
        format: AudioFormat,
        cancel: &CancelToken,
        logger: &JobLogger,
    ) -> StepResult<AudioFile>;
}

/// Splits a WAV file into stems.
///
/// Every line the tool prints is passed to `on_line` as it arrives.
pub trait StemSeparator: Send + Sync {
    fn separate(
        &self,
        input: &AudioFile,
        output_dir: &Path,
        cancel: &CancelToken,
        on_line: &mut dyn FnMut(&str),
        logger: &JobLogger,
    ) -> StepResult<SeparatedAudio>;

    /// Directory the stems of `input` land in.
    fn stems_dir(&self, input: &AudioFile, output_dir: &Path) -> PathBuf;
}
