//! Separate step - splits the converted WAV into stems.

use crate::models::{ProcessingJob, ProcessingStatus};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};
use crate::stages::parse_progress_percent;

/// Highest overall percentage reported while separation is still running.
const SEPARATION_CEILING: u32 = 99;

/// Separate step. Stores the stems in `ProcessingJob::separated_audio`.
///
/// Percentages parsed from the separator's output are scaled into the
/// range between this step's start percentage and completion.
pub struct SeparateStep {
    percent: u32,
}

impl SeparateStep {
    pub fn new(percent: u32) -> Self {
        Self { percent }
    }

    /// Overall percentage for a separator-reported `tool_percent`.
    fn overall_percent(&self, tool_percent: u32) -> u32 {
        let span = SEPARATION_CEILING.saturating_sub(self.percent);
        self.percent + span * tool_percent.min(100) / 100
    }
}

impl PipelineStep for SeparateStep {
    fn name(&self) -> &str {
        "Separate"
    }

    fn description(&self) -> &str {
        "Separating audio into stems..."
    }

    fn status(&self) -> ProcessingStatus {
        ProcessingStatus::Splitting
    }

    fn percent(&self) -> u32 {
        self.percent
    }

    fn validate_input(&self, _ctx: &Context, job: &ProcessingJob) -> StepResult<()> {
        match job.converted_file {
            Some(ref file) if file.exists() => Ok(()),
            Some(ref file) => Err(StepError::file_not_found(file.path.to_string_lossy())),
            None => Err(StepError::invalid_input("No converted WAV to separate")),
        }
    }

    fn execute(&self, ctx: &Context, job: &mut ProcessingJob) -> StepResult<StepOutcome> {
        let input = job
            .converted_file
            .clone()
            .ok_or_else(|| StepError::invalid_input("No converted WAV to separate"))?;

        let mut last_reported = self.percent;
        let mut on_line = |line: &str| {
            if let Some(tool_percent) = parse_progress_percent(line) {
                let overall = self.overall_percent(tool_percent);
                if overall > last_reported {
                    last_reported = overall;
                    ctx.report_progress(
                        ProcessingStatus::Splitting,
                        overall,
                        &format!("{} {}%", self.description(), tool_percent),
                    );
                }
            }
        };

        let separated = ctx.stages.separator.separate(
            &input,
            &ctx.output_dir,
            &ctx.cancel,
            &mut on_line,
            &ctx.logger,
        )?;

        ctx.logger.info(&format!(
            "{} stems in {}",
            separated.stem_count(),
            ctx.stages
                .separator
                .stems_dir(&input, &ctx.output_dir)
                .display()
        ));
        job.separated_audio = Some(separated);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &ProcessingJob) -> StepResult<()> {
        if job.separated_audio.is_none() {
            return Err(StepError::invalid_output("Separation did not record stems"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_tool_progress_into_remaining_range() {
        let step = SeparateStep::new(70);
        assert_eq!(step.overall_percent(0), 70);
        assert_eq!(step.overall_percent(50), 84);
        assert_eq!(step.overall_percent(100), 99);

        let local = SeparateStep::new(50);
        assert_eq!(local.overall_percent(100), 99);
    }
}
