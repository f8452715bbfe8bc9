//! Job-related data structures (requests, job record, progress, results).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::{AudioFormat, ProcessingStatus};
use super::media::{AudioFile, AudioSource, SeparatedAudio};
use super::ModelError;

/// Request to download, convert and optionally split a remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteJobRequest {
    pub url: String,
    pub output_dir: PathBuf,
    /// Codec the download tool extracts into.
    pub format: AudioFormat,
    pub should_split: bool,
}

impl RemoteJobRequest {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            format: AudioFormat::Wav,
            should_split: true,
        }
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_split(mut self, should_split: bool) -> Self {
        self.should_split = should_split;
        self
    }
}

/// Request to convert and optionally split a file already on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalJobRequest {
    pub path: PathBuf,
    pub output_dir: PathBuf,
    pub should_split: bool,
}

impl LocalJobRequest {
    pub fn new(path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            output_dir: output_dir.into(),
            should_split: true,
        }
    }

    pub fn with_split(mut self, should_split: bool) -> Self {
        self.should_split = should_split;
        self
    }
}

/// The record of one orchestration run.
///
/// Owned by the orchestrator for the duration of a run and discarded
/// afterwards. Status only moves through [`ProcessingJob::transition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub source: AudioSource,
    pub output_dir: PathBuf,
    pub download_format: AudioFormat,
    pub should_split: bool,
    status: ProcessingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_file: Option<AudioFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_file: Option<AudioFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separated_audio: Option<SeparatedAudio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the run started.
    pub started_at: String,
}

impl ProcessingJob {
    pub fn new(
        source: AudioSource,
        output_dir: impl Into<PathBuf>,
        download_format: AudioFormat,
        should_split: bool,
    ) -> Self {
        Self {
            source,
            output_dir: output_dir.into(),
            download_format,
            should_split,
            status: ProcessingStatus::Pending,
            downloaded_file: None,
            converted_file: None,
            separated_audio: None,
            error_message: None,
            started_at: chrono::Local::now().to_rfc3339(),
        }
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    /// Move to `next`, rejecting jumps the transition table forbids.
    pub fn transition(&mut self, next: ProcessingStatus) -> Result<(), ModelError> {
        self.status.check_transition(next)?;
        self.status = next;
        Ok(())
    }

    /// Mark failed with a message. No-op once the job is terminal.
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        if self.transition(ProcessingStatus::Failed).is_ok() {
            self.error_message = Some(message.into());
        }
    }

    /// Mark cancelled. No-op once the job is terminal.
    pub fn mark_cancelled(&mut self) {
        let _ = self.transition(ProcessingStatus::Cancelled);
    }
}

/// Progress notification sent across the callback boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingProgress {
    pub status: ProcessingStatus,
    pub message: String,
    /// 0–100.
    pub percentage: u32,
}

impl ProcessingProgress {
    pub fn new(status: ProcessingStatus, message: impl Into<String>, percentage: u32) -> Self {
        Self {
            status,
            message: message.into(),
            percentage: percentage.min(100),
        }
    }
}

/// Final outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub status: ProcessingStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingResult {
    pub fn completed(message: impl Into<String>, output_path: PathBuf) -> Self {
        Self {
            success: true,
            status: ProcessingStatus::Completed,
            message: message.into(),
            output_path: Some(output_path),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status: ProcessingStatus::Failed,
            message: message.into(),
            output_path: None,
            error: Some(error.into()),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            success: false,
            status: ProcessingStatus::Cancelled,
            message: "Process cancelled".to_string(),
            output_path: None,
            error: Some("User cancelled the operation".to_string()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == ProcessingStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_job() -> ProcessingJob {
        ProcessingJob::new(
            AudioSource::remote("https://example.com/v/abc").unwrap(),
            "/tmp/out",
            AudioFormat::Wav,
            true,
        )
    }

    #[test]
    fn job_follows_transition_table() {
        let mut job = remote_job();
        assert_eq!(job.status(), ProcessingStatus::Pending);

        job.transition(ProcessingStatus::Downloading).unwrap();
        job.transition(ProcessingStatus::Converting).unwrap();
        assert!(job.transition(ProcessingStatus::Downloading).is_err());
        assert_eq!(job.status(), ProcessingStatus::Converting);
    }

    #[test]
    fn failure_is_absorbing() {
        let mut job = remote_job();
        job.mark_failed("boom");
        assert_eq!(job.status(), ProcessingStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("boom"));

        // Later failures and cancellations do not overwrite
        job.mark_failed("second");
        job.mark_cancelled();
        assert_eq!(job.status(), ProcessingStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn progress_clamps_percentage() {
        let p = ProcessingProgress::new(ProcessingStatus::Splitting, "x", 140);
        assert_eq!(p.percentage, 100);
    }

    #[test]
    fn job_serializes_status() {
        let job = remote_job();
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"status\":\"pending\""));
        assert!(json.contains("\"kind\":\"remote\""));
    }
}
