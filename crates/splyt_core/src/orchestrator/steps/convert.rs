//! Convert step - normalizes the audio to WAV for separation.

use crate::models::{AudioFile, AudioFormat, AudioSource, ProcessingJob, ProcessingStatus};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};

/// Convert step. Always targets WAV.
///
/// Input is the downloaded file, or the local source file when there was
/// no download. Stores the result in `ProcessingJob::converted_file`.
pub struct ConvertStep {
    percent: u32,
}

impl ConvertStep {
    /// Convert step reporting `percent` when it starts.
    pub fn new(percent: u32) -> Self {
        Self { percent }
    }

    fn input_file(job: &ProcessingJob) -> Option<AudioFile> {
        if let Some(ref file) = job.downloaded_file {
            return Some(file.clone());
        }
        match job.source {
            AudioSource::Local { ref path } => {
                Some(AudioFile::new(path.clone(), job.download_format))
            }
            AudioSource::Remote { .. } => None,
        }
    }
}

impl PipelineStep for ConvertStep {
    fn name(&self) -> &str {
        "Convert"
    }

    fn description(&self) -> &str {
        "Converting to WAV..."
    }

    fn status(&self) -> ProcessingStatus {
        ProcessingStatus::Converting
    }

    fn percent(&self) -> u32 {
        self.percent
    }

    fn validate_input(&self, _ctx: &Context, job: &ProcessingJob) -> StepResult<()> {
        let input = Self::input_file(job)
            .ok_or_else(|| StepError::invalid_input("Nothing to convert: no audio downloaded"))?;

        if !input.exists() {
            return Err(StepError::file_not_found(input.path.to_string_lossy()));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, job: &mut ProcessingJob) -> StepResult<StepOutcome> {
        let input = Self::input_file(job)
            .ok_or_else(|| StepError::invalid_input("Nothing to convert: no audio downloaded"))?;

        let converted = ctx.stages.converter.convert(
            &input,
            &ctx.output_dir,
            AudioFormat::Wav,
            &ctx.cancel,
            &ctx.logger,
        )?;

        let unchanged = converted.path == input.path;
        job.converted_file = Some(converted);

        if unchanged {
            return Ok(StepOutcome::Skipped(format!(
                "{} is already WAV",
                input.file_name()
            )));
        }
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &ProcessingJob) -> StepResult<()> {
        match job.converted_file {
            Some(ref file) if file.format != AudioFormat::Wav => Err(StepError::invalid_output(
                format!("Converted file is not WAV: {}", file.path.display()),
            )),
            Some(ref file) if !file.exists() => {
                Err(StepError::file_not_found(file.path.to_string_lossy()))
            }
            Some(_) => Ok(()),
            None => Err(StepError::invalid_output("Conversion did not record a file")),
        }
    }
}
