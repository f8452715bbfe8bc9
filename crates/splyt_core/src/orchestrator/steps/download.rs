//! Download step - fetches remote audio with the configured downloader.

use crate::models::{ProcessingJob, ProcessingStatus};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};

/// Download step for remote sources.
///
/// Stores the downloaded file in `ProcessingJob::downloaded_file`.
pub struct DownloadStep;

impl DownloadStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DownloadStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for DownloadStep {
    fn name(&self) -> &str {
        "Download"
    }

    fn description(&self) -> &str {
        "Downloading audio..."
    }

    fn status(&self) -> ProcessingStatus {
        ProcessingStatus::Downloading
    }

    fn percent(&self) -> u32 {
        10
    }

    fn validate_input(&self, _ctx: &Context, job: &ProcessingJob) -> StepResult<()> {
        if !job.source.is_remote() {
            return Err(StepError::invalid_input(format!(
                "Download needs a remote source, got {}",
                job.source.location()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, job: &mut ProcessingJob) -> StepResult<StepOutcome> {
        ctx.logger.info(&format!("Source: {}", job.source.location()));

        let file = ctx.stages.downloader.download(
            &job.source,
            &ctx.output_dir,
            job.download_format,
            &ctx.cancel,
            &ctx.logger,
        )?;

        ctx.logger.info(&format!("Audio file: {}", file.path.display()));
        job.downloaded_file = Some(file);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &ProcessingJob) -> StepResult<()> {
        match job.downloaded_file {
            Some(ref file) if file.exists() => Ok(()),
            Some(ref file) => Err(StepError::file_not_found(file.path.to_string_lossy())),
            None => Err(StepError::invalid_output("Download did not record a file")),
        }
    }
}
