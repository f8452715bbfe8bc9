//! Pipeline orchestrator for coordinating job execution.
//!
//! Each job is a sequence of steps that move a [`ProcessingJob`] through
//! its status table, validate, execute, and record their results.
//!
//! # Architecture
//!
//! ```text
//! JobWorker (one job thread)
//!     └── Processor
//!             └── Pipeline
//!                     ├── Step: Download   (remote only)
//!                     ├── Step: Convert
//!                     └── Step: Separate   (when splitting)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use splyt_core::config::Settings;
//! use splyt_core::models::LocalJobRequest;
//! use splyt_core::orchestrator::{JobWorker, Processor};
//!
//! let worker = JobWorker::new(Processor::new(Settings::default(), ".logs"));
//! let cancel = worker
//!     .start_local(LocalJobRequest::new("song.mp3", "Demucs_Cuts"), None, None)
//!     .unwrap();
//!
//! // cancel.cancel() stops the job at the next boundary.
//! let result = worker.wait().unwrap();
//! println!("{:?}", result.output_path);
//! ```
//!
//! [`ProcessingJob`]: crate::models::ProcessingJob

mod errors;
mod pipeline;
mod processor;
mod step;
pub mod steps;
mod types;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{CancelToken, Pipeline, PipelineRunResult};
pub use processor::{LogSink, Processor};
pub use step::PipelineStep;
pub use steps::{ConvertStep, DownloadStep, SeparateStep};
pub use types::{Context, ProgressCallback, Stages, StepOutcome};
pub use worker::{CompletionCallback, JobWorker, WorkerError};
