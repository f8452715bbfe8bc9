//! Entry points that turn a job request into a [`ProcessingResult`].
//!
//! The processor builds the job record, logger and pipeline, runs it, and
//! converts every outcome (including a panic inside a stage) into a result.
//! The progress callback always receives a final message.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::logging::{sanitize_filename, GuiLogCallback, JobLogger, LogConfig};
use crate::models::{
    AudioFile, AudioSource, LocalJobRequest, ProcessingJob, ProcessingProgress,
    ProcessingResult, ProcessingStatus, RemoteJobRequest,
};
use crate::tools::ToolResolver;

use super::errors::PipelineError;
use super::pipeline::{CancelToken, Pipeline};
use super::steps::{ConvertStep, DownloadStep, SeparateStep};
use super::types::{Context, ProgressCallback, Stages};

/// Sink receiving every formatted job log line.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Progress percentages and messages for one kind of job.
struct JobPlan {
    convert_percent: u32,
    separate_percent: u32,
    done_progress: &'static str,
    done_result: &'static str,
}

const REMOTE_SPLIT: JobPlan = JobPlan {
    convert_percent: 40,
    separate_percent: 70,
    done_progress: "All processing completed!",
    done_result: "Audio processed and separated successfully",
};

const REMOTE_NO_SPLIT: JobPlan = JobPlan {
    convert_percent: 40,
    separate_percent: 70,
    done_progress: "Download and conversion completed!",
    done_result: "Audio processed successfully",
};

const LOCAL: JobPlan = JobPlan {
    convert_percent: 20,
    separate_percent: 50,
    done_progress: "Processing completed!",
    done_result: "Local file processed successfully",
};

/// Runs download/convert/separate jobs.
///
/// # Example
///
/// ```no_run
/// use splyt_core::config::Settings;
/// use splyt_core::models::RemoteJobRequest;
/// use splyt_core::orchestrator::{CancelToken, Processor};
///
/// let processor = Processor::new(Settings::default(), ".logs");
/// let request = RemoteJobRequest::new("https://www.youtube.com/watch?v=abc", "Demucs_Cuts");
/// let result = processor.process_remote(&request, None, &CancelToken::new());
/// println!("{}", result.message);
/// ```
pub struct Processor {
    settings: Settings,
    stages: Stages,
    log_dir: PathBuf,
    log_sink: Option<LogSink>,
}

impl Processor {
    /// Processor with tool-backed stages resolved from `settings`.
    pub fn new(settings: Settings, log_dir: impl Into<PathBuf>) -> Self {
        let resolver = ToolResolver::from_settings(&settings);
        Self::with_resolver(settings, log_dir, &resolver)
    }

    /// Processor with tool-backed stages resolved by `resolver`.
    pub fn with_resolver(
        settings: Settings,
        log_dir: impl Into<PathBuf>,
        resolver: &ToolResolver,
    ) -> Self {
        let stages = Stages::from_settings(&settings, resolver);
        Self {
            settings,
            stages,
            log_dir: log_dir.into(),
            log_sink: None,
        }
    }

    /// Replace the stage implementations.
    pub fn with_stages(mut self, stages: Stages) -> Self {
        self.stages = stages;
        self
    }

    /// Mirror job log lines to `sink` (console, GUI).
    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Download `request.url`, convert to WAV and optionally split.
    pub fn process_remote(
        &self,
        request: &RemoteJobRequest,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ProcessingResult {
        let source = match AudioSource::remote(&request.url) {
            Ok(source) => source,
            Err(e) => return fail_early(progress.as_ref(), "Invalid URL", e.to_string()),
        };

        let job = ProcessingJob::new(
            source,
            &request.output_dir,
            request.format,
            request.should_split,
        );

        let plan = if request.should_split {
            &REMOTE_SPLIT
        } else {
            &REMOTE_NO_SPLIT
        };

        let mut pipeline = Pipeline::new()
            .with_step(DownloadStep::new())
            .with_step(ConvertStep::new(plan.convert_percent));
        if request.should_split {
            pipeline.add_step(SeparateStep::new(plan.separate_percent));
        }

        self.run_job(job_name("download"), job, &pipeline, plan, progress, cancel)
    }

    /// Convert a local file to WAV and optionally split.
    ///
    /// A missing file fails before any stage runs.
    pub fn process_local(
        &self,
        request: &LocalJobRequest,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ProcessingResult {
        let source = match AudioSource::local(&request.path) {
            Ok(source) => source,
            Err(e) => return fail_early(progress.as_ref(), "File not found", e.to_string()),
        };

        let format = AudioFile::from_path(&request.path).format;

        let job = ProcessingJob::new(source, &request.output_dir, format, request.should_split);

        let mut pipeline = Pipeline::new().with_step(ConvertStep::new(LOCAL.convert_percent));
        if request.should_split {
            pipeline.add_step(SeparateStep::new(LOCAL.separate_percent));
        }

        let base = request
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string());

        self.run_job(job_name(&base), job, &pipeline, &LOCAL, progress, cancel)
    }

    fn run_job(
        &self,
        job_name: String,
        mut job: ProcessingJob,
        pipeline: &Pipeline,
        plan: &JobPlan,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ProcessingResult {
        if let Err(e) = fs::create_dir_all(&job.output_dir) {
            let err = PipelineError::setup_failed(
                &job_name,
                format!("cannot create {}: {}", job.output_dir.display(), e),
            );
            return fail_early(progress.as_ref(), "Processing failed", err.to_string());
        }

        let gui_callback = self
            .log_sink
            .clone()
            .map(|sink| Box::new(move |line: &str| sink(line)) as GuiLogCallback);
        let logger = match JobLogger::new(
            &job_name,
            &self.log_dir,
            LogConfig::from(&self.settings.logging),
            gui_callback,
        ) {
            Ok(logger) => Arc::new(logger),
            Err(e) => {
                let err = PipelineError::setup_failed(&job_name, format!("cannot open log: {}", e));
                return fail_early(progress.as_ref(), "Processing failed", err.to_string());
            }
        };

        let mut ctx = Context::new(
            self.settings.clone(),
            &job_name,
            job.output_dir.clone(),
            Arc::clone(&logger),
            cancel.clone(),
            self.stages.clone(),
        );
        if let Some(callback) = progress {
            ctx = ctx.with_progress_callback(callback);
        }

        ctx.logger.info(&format!("Starting job: {}", job_name));
        ctx.logger.info(&format!("Source: {}", job.source.location()));
        ctx.logger
            .info(&format!("Output folder: {}", job.output_dir.display()));
        ctx.logger.info(&format!("Steps: {}", pipeline.step_names().join(" -> ")));
        tracing::info!("Starting job {} ({})", job_name, job.source.location());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(&ctx, &mut job)))
            .unwrap_or_else(|payload| {
                Err(PipelineError::panicked(&job_name, panic_message(payload.as_ref())))
            })
            .and_then(|run| {
                if cancel.is_cancelled() {
                    ctx.logger.warn("Cancelled after the last step");
                    return Err(PipelineError::cancelled(&job_name));
                }
                job.transition(ProcessingStatus::Completed)
                    .map_err(|e| PipelineError::invalid_transition(&job_name, e))?;
                Ok(run)
            });

        let result = match outcome {
            Ok(run) => {
                let output_path = completed_output(&ctx, &job);
                ctx.report_progress(ProcessingStatus::Completed, 100, plan.done_progress);
                ctx.logger.success(&format!(
                    "{} ({} steps, {} skipped)",
                    plan.done_result,
                    run.total_steps(),
                    run.steps_skipped.len()
                ));
                ctx.logger.info(&format!("Output: {}", output_path.display()));
                ProcessingResult::completed(plan.done_result, output_path)
            }
            Err(e) if e.is_cancelled() => {
                job.mark_cancelled();
                ctx.report_progress(ProcessingStatus::Cancelled, 0, "Process cancelled");
                ctx.logger.warn("Job cancelled by user");
                ProcessingResult::cancelled()
            }
            Err(e) => {
                let message = e.to_string();
                job.mark_failed(&message);
                ctx.report_progress(
                    ProcessingStatus::Failed,
                    0,
                    &format!("Processing failed: {}", message),
                );
                ctx.logger.error(&message);
                tracing::warn!("Job {} failed: {}", job_name, message);
                ProcessingResult::failed("Processing failed", message)
            }
        };

        logger.flush();
        result
    }
}

/// Stems directory when the job split, otherwise the converted WAV.
fn completed_output(ctx: &Context, job: &ProcessingJob) -> PathBuf {
    match job.converted_file {
        Some(ref wav) if job.should_split => ctx.stages.separator.stems_dir(wav, &ctx.output_dir),
        Some(ref wav) => wav.path.clone(),
        None => job.output_dir.clone(),
    }
}

/// A failure before any pipeline was set up.
fn fail_early(
    progress: Option<&ProgressCallback>,
    message: &str,
    error: String,
) -> ProcessingResult {
    tracing::warn!("{}: {}", message, error);
    if let Some(callback) = progress {
        callback(&ProcessingProgress::new(
            ProcessingStatus::Failed,
            format!("Processing failed: {}", error),
            0,
        ));
    }
    ProcessingResult::failed(message, error)
}

fn job_name(base: &str) -> String {
    format!(
        "{}_{}",
        sanitize_filename(base),
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
