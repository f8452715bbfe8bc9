//! Pipeline runner that executes steps in sequence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::models::ProcessingJob;

use super::errors::{PipelineError, PipelineResult};
use super::step::PipelineStep;
use super::types::{Context, StepOutcome};

/// Pipeline that runs a sequence of steps.
///
/// The pipeline executes steps in order, moving the job through each
/// step's status and running validation before and after each step.
/// Cancellation is checked at every step boundary.
pub struct Pipeline {
    /// Steps to execute in order.
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Add a step to the pipeline.
    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Run the pipeline against `job`.
    ///
    /// For each step:
    /// 1. Check for cancellation (job moves to `Cancelled`)
    /// 2. Transition the job to the step's status and report progress
    /// 3. Run `validate_input`, `execute`, `validate_output`
    ///
    /// The job is left in the last step's status on success; completing it
    /// is up to the caller.
    pub fn run(&self, ctx: &Context, job: &mut ProcessingJob) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult {
            steps_completed: Vec::new(),
            steps_skipped: Vec::new(),
        };

        for step in &self.steps {
            let step_name = step.name();

            if ctx.cancel.is_cancelled() {
                ctx.logger
                    .warn(&format!("Pipeline cancelled before step '{}'", step_name));
                job.mark_cancelled();
                return Err(PipelineError::cancelled(&ctx.job_name));
            }

            job.transition(step.status())
                .map_err(|e| PipelineError::invalid_transition(&ctx.job_name, e))?;

            ctx.logger.phase(step_name);
            ctx.report_progress(step.status(), step.percent(), step.progress_message());
            tracing::debug!("[{}] {} -> {}", ctx.job_name, step_name, step.status());

            ctx.logger.debug(&format!("Validating input for '{}'", step_name));
            if let Err(e) = step.validate_input(ctx, job) {
                ctx.logger.error(&format!("Input validation failed: {}", e));
                return Err(PipelineError::step_failed(&ctx.job_name, step_name, e));
            }

            ctx.logger.debug(&format!("Executing '{}'", step_name));
            let outcome = step.execute(ctx, job).map_err(|e| {
                if e.is_cancelled() {
                    ctx.logger.warn(&format!("{} cancelled", step_name));
                } else {
                    ctx.logger.error(&format!("Execution failed: {}", e));
                }
                PipelineError::step_failed(&ctx.job_name, step_name, e)
            })?;

            match outcome {
                StepOutcome::Success => {
                    ctx.logger
                        .debug(&format!("Validating output for '{}'", step_name));
                    if let Err(e) = step.validate_output(ctx, job) {
                        ctx.logger.error(&format!("Output validation failed: {}", e));
                        return Err(PipelineError::step_failed(&ctx.job_name, step_name, e));
                    }

                    ctx.logger.success(&format!("{} completed", step_name));
                    result.steps_completed.push(step_name.to_string());
                }
                StepOutcome::Skipped(reason) => {
                    ctx.logger
                        .info(&format!("{} skipped: {}", step_name, reason));
                    result.steps_skipped.push(step_name.to_string());
                }
            }
        }

        Ok(result)
    }

    /// Get the number of steps in the pipeline.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get step names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared cancellation flag for one job.
///
/// Clones observe the same flag. Stages check it at boundaries and inside
/// their process poll loops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRunResult {
    /// Steps that completed successfully.
    pub steps_completed: Vec<String>,
    /// Steps that were skipped.
    pub steps_skipped: Vec<String>,
}

impl PipelineRunResult {
    /// Check if all steps completed (none skipped).
    pub fn all_completed(&self) -> bool {
        self.steps_skipped.is_empty()
    }

    /// Total number of steps that ran.
    pub fn total_steps(&self) -> usize {
        self.steps_completed.len() + self.steps_skipped.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AudioFormat, AudioSource, ProcessingStatus};
    use crate::orchestrator::errors::{StepError, StepResult};
    use crate::orchestrator::testing::{mock_context, MockStages};
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    struct CountingStep {
        name: &'static str,
        status: ProcessingStatus,
        execute_count: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CountingStep {
        fn new(name: &'static str, status: ProcessingStatus, count: &Arc<AtomicUsize>) -> Self {
            Self {
                name,
                status,
                execute_count: Arc::clone(count),
                fail: false,
            }
        }
    }

    impl PipelineStep for CountingStep {
        fn name(&self) -> &str {
            self.name
        }

        fn status(&self) -> ProcessingStatus {
            self.status
        }

        fn percent(&self) -> u32 {
            10
        }

        fn validate_input(&self, _ctx: &Context, _job: &ProcessingJob) -> StepResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _job: &mut ProcessingJob) -> StepResult<StepOutcome> {
            self.execute_count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StepError::command_failed("ffmpeg", 1, "boom"));
            }
            Ok(StepOutcome::Success)
        }

        fn validate_output(&self, _ctx: &Context, _job: &ProcessingJob) -> StepResult<()> {
            Ok(())
        }
    }

    fn remote_job(dir: &std::path::Path) -> ProcessingJob {
        ProcessingJob::new(
            AudioSource::remote("https://e.com/v").unwrap(),
            dir,
            AudioFormat::Wav,
            true,
        )
    }

    #[test]
    fn pipeline_builds_correctly() {
        let count = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("Step1", ProcessingStatus::Downloading, &count))
            .with_step(CountingStep::new("Step2", ProcessingStatus::Converting, &count));

        assert_eq!(pipeline.step_count(), 2);
        assert_eq!(pipeline.step_names(), vec!["Step1", "Step2"]);
    }

    #[test]
    fn cancel_token_clones_share_flag() {
        let token = CancelToken::new();
        let clone = token.clone();

        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn runs_steps_and_transitions() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let (ctx, progress) = mock_context(dir.path(), MockStages::default());
        let mut job = remote_job(dir.path());

        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("Download", ProcessingStatus::Downloading, &count))
            .with_step(CountingStep::new("Convert", ProcessingStatus::Converting, &count));

        let result = pipeline.run(&ctx, &mut job).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(result.all_completed());
        assert_eq!(result.total_steps(), 2);
        assert_eq!(job.status(), ProcessingStatus::Converting);

        let statuses: Vec<_> = progress.lock().iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![ProcessingStatus::Downloading, ProcessingStatus::Converting]
        );
    }

    #[test]
    fn cancelled_before_first_step() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let (ctx, _progress) = mock_context(dir.path(), MockStages::default());
        ctx.cancel.cancel();
        let mut job = remote_job(dir.path());

        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("Download", ProcessingStatus::Downloading, &count));

        let err = pipeline.run(&ctx, &mut job).unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled { .. }));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(job.status(), ProcessingStatus::Cancelled);
    }

    #[test]
    fn step_failure_stops_pipeline() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let (ctx, _progress) = mock_context(dir.path(), MockStages::default());
        let mut job = remote_job(dir.path());

        let mut failing = CountingStep::new("Download", ProcessingStatus::Downloading, &count);
        failing.fail = true;
        let pipeline = Pipeline::new()
            .with_step(failing)
            .with_step(CountingStep::new("Convert", ProcessingStatus::Converting, &count));

        let err = pipeline.run(&ctx, &mut job).unwrap_err();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(err.step_error().and_then(|e| e.exit_code()), Some(1));
    }

    #[test]
    fn forbidden_transition_is_rejected() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let (ctx, _progress) = mock_context(dir.path(), MockStages::default());
        let mut job = remote_job(dir.path());

        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("Separate", ProcessingStatus::Splitting, &count));

        let err = pipeline.run(&ctx, &mut job).unwrap_err();

        assert!(matches!(err, PipelineError::InvalidTransition { .. }));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
