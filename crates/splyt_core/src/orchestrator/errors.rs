//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Job → Step → Operation → Detail

use std::io;

use thiserror::Error;

use crate::models::ModelError;

/// Top-level pipeline error with job context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Job '{job_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        job_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Pipeline was cancelled.
    #[error("Job '{job_name}' was cancelled")]
    Cancelled { job_name: String },

    /// Failed to set up the job (create directories, open log, etc.).
    #[error("Job '{job_name}' setup failed: {message}")]
    SetupFailed { job_name: String, message: String },

    /// A status change the transition table forbids.
    #[error("Job '{job_name}': {source}")]
    InvalidTransition {
        job_name: String,
        #[source]
        source: ModelError,
    },

    /// A stage panicked.
    #[error("Job '{job_name}' aborted unexpectedly: {message}")]
    Panicked { job_name: String, message: String },
}

impl PipelineError {
    pub fn step_failed(
        job_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_name: job_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    pub fn setup_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(job_name: impl Into<String>) -> Self {
        Self::Cancelled {
            job_name: job_name.into(),
        }
    }

    pub fn invalid_transition(job_name: impl Into<String>, source: ModelError) -> Self {
        Self::InvalidTransition {
            job_name: job_name.into(),
            source,
        }
    }

    pub fn panicked(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Panicked {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the user cancelled, not a failure.
    ///
    /// A step that observed the cancel token mid-call counts as cancelled.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::StepFailed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// The underlying step error, if any.
    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            Self::StepFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error from a pipeline stage with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Wrong kind of input for this stage.
    #[error("Invalid argument: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// An external command exited non-zero.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// The external tool could not be started at all.
    #[error("Could not run {tool} ({program}): {source}")]
    ToolNotFound {
        tool: String,
        program: String,
        #[source]
        source: io::Error,
    },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A required file was not found.
    #[error("Required file not found: {path}")]
    FileNotFound { path: String },

    /// Expected output never appeared within the bounded wait.
    #[error("Output file did not appear after {attempts} checks: {path}")]
    OutputNotVisible { path: String, attempts: u32 },

    /// Cancellation observed while the stage was running.
    #[error("Cancelled during {operation}")]
    Cancelled { operation: String },
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    pub fn tool_not_found(
        tool: impl Into<String>,
        program: impl Into<String>,
        source: io::Error,
    ) -> Self {
        Self::ToolNotFound {
            tool: tool.into(),
            program: program.into(),
            source,
        }
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn output_not_visible(path: impl Into<String>, attempts: u32) -> Self {
        Self::OutputNotVisible {
            path: path.into(),
            attempts,
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Exit code of a failed external command.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_displays_context() {
        let err = StepError::command_failed("yt-dlp", 2, "Unsupported URL");
        let msg = err.to_string();
        assert!(msg.contains("yt-dlp"));
        assert!(msg.contains("exit code 2"));
        assert!(msg.contains("Unsupported URL"));
        assert_eq!(err.exit_code(), Some(2));
    }

    #[test]
    fn pipeline_error_chains_context() {
        let step_err = StepError::file_not_found("/music/missing.mp3");
        let pipeline_err = PipelineError::step_failed("song", "Convert", step_err);

        let msg = pipeline_err.to_string();
        assert!(msg.contains("song"));
        assert!(msg.contains("Convert"));
        assert!(msg.contains("missing.mp3"));
        assert!(!pipeline_err.is_cancelled());
    }

    #[test]
    fn cancelled_step_counts_as_cancelled() {
        let err = PipelineError::step_failed("job", "Download", StepError::cancelled("yt-dlp"));
        assert!(err.is_cancelled());
        assert!(PipelineError::cancelled("job").is_cancelled());
    }
}
