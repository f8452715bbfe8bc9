//! Pipeline step trait definition.
//!
//! All pipeline steps implement this trait, providing a consistent
//! interface for validation and execution.

use crate::models::{ProcessingJob, ProcessingStatus};

use super::errors::StepResult;
use super::types::{Context, StepOutcome};

/// Trait for pipeline steps.
///
/// Before running a step the pipeline moves the job into [`status`] and
/// reports [`percent`]. It then calls, in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work
/// 3. `validate_output` - Verify the step produced valid output
///
/// [`status`]: PipelineStep::status
/// [`percent`]: PipelineStep::percent
pub trait PipelineStep: Send + Sync {
    /// Get the step name (for logging and error context).
    fn name(&self) -> &str;

    /// Status the job is in while this step runs.
    fn status(&self) -> ProcessingStatus;

    /// Overall progress reported when the step starts.
    fn percent(&self) -> u32;

    /// Message reported when the step starts.
    fn progress_message(&self) -> &str {
        self.description()
    }

    /// Validate inputs before execution.
    fn validate_input(&self, ctx: &Context, job: &ProcessingJob) -> StepResult<()>;

    /// Execute the step's main work and record results in `job`.
    ///
    /// Returns `StepOutcome::Skipped` if the step decided there was nothing
    /// to do (not an error).
    fn execute(&self, ctx: &Context, job: &mut ProcessingJob) -> StepResult<StepOutcome>;

    /// Validate outputs after execution.
    fn validate_output(&self, ctx: &Context, job: &ProcessingJob) -> StepResult<()>;

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
