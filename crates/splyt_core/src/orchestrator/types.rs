//! Core types for the orchestrator pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::logging::JobLogger;
use crate::models::{ProcessingProgress, ProcessingStatus};
use crate::stages::{
    AudioConverter, AudioDownloader, DemucsSeparator, FfmpegConverter, StemSeparator,
    YtDlpDownloader,
};
use crate::tools::{Tool, ToolResolver};

use super::pipeline::CancelToken;

/// Progress callback type for reporting pipeline progress.
pub type ProgressCallback = Box<dyn Fn(&ProcessingProgress) + Send + Sync>;

/// The stage implementations a job runs with.
#[derive(Clone)]
pub struct Stages {
    pub downloader: Arc<dyn AudioDownloader>,
    pub converter: Arc<dyn AudioConverter>,
    pub separator: Arc<dyn StemSeparator>,
}

impl Stages {
    /// Tool-backed stages configured from settings.
    pub fn from_settings(settings: &Settings, resolver: &ToolResolver) -> Self {
        Self {
            downloader: Arc::new(YtDlpDownloader::from_settings(
                resolver.resolve(Tool::YtDlp),
                &settings.download,
            )),
            converter: Arc::new(FfmpegConverter::from_settings(
                resolver.resolve(Tool::Ffmpeg),
                &settings.conversion,
            )),
            separator: Arc::new(DemucsSeparator::from_settings(
                resolver.resolve(Tool::Demucs),
                &settings.separation,
            )),
        }
    }
}

/// Read-only context passed to pipeline steps.
///
/// Mutable state goes in the [`ProcessingJob`](crate::models::ProcessingJob).
pub struct Context {
    /// Application settings.
    pub settings: Settings,
    /// Job name/identifier.
    pub job_name: String,
    /// Directory every stage writes into.
    pub output_dir: PathBuf,
    /// Per-job logger.
    pub logger: Arc<JobLogger>,
    /// Cancellation flag shared with whoever started the job.
    pub cancel: CancelToken,
    pub stages: Stages,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    pub fn new(
        settings: Settings,
        job_name: impl Into<String>,
        output_dir: PathBuf,
        logger: Arc<JobLogger>,
        cancel: CancelToken,
        stages: Stages,
    ) -> Self {
        Self {
            settings,
            job_name: job_name.into(),
            output_dir,
            logger,
            cancel,
            stages,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Report progress to the callback (if set) and the job log.
    pub fn report_progress(&self, status: ProcessingStatus, percent: u32, message: &str) {
        self.logger.progress(percent);
        if let Some(ref callback) = self.progress_callback {
            callback(&ProcessingProgress::new(status, message, percent));
        }
    }
}

/// Outcome of executing a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (with reason).
    Skipped(String),
}
