//! Background worker running one job at a time.
//!
//! A second job started while one is alive is rejected with
//! [`WorkerError::Busy`], not queued.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use thiserror::Error;

use crate::models::{LocalJobRequest, ProcessingResult, RemoteJobRequest};

use super::pipeline::CancelToken;
use super::processor::{panic_message, Processor};
use super::types::ProgressCallback;

/// Called with the final result of every job, on the worker thread.
pub type CompletionCallback = Box<dyn FnOnce(&ProcessingResult) + Send>;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("A job is already running")]
    Busy,

    #[error("Failed to start worker thread: {0}")]
    Spawn(#[source] io::Error),
}

struct RunningJob {
    cancel: CancelToken,
    handle: JoinHandle<ProcessingResult>,
}

/// Runs processor invocations on a dedicated thread.
pub struct JobWorker {
    processor: Arc<Processor>,
    current: Mutex<Option<RunningJob>>,
}

impl JobWorker {
    pub fn new(processor: Processor) -> Self {
        Self {
            processor: Arc::new(processor),
            current: Mutex::new(None),
        }
    }

    /// Start a remote job. Returns the job's cancel token.
    pub fn start_remote(
        &self,
        request: RemoteJobRequest,
        progress: Option<ProgressCallback>,
        on_complete: Option<CompletionCallback>,
    ) -> Result<CancelToken, WorkerError> {
        self.start(
            move |processor, cancel| processor.process_remote(&request, progress, cancel),
            on_complete,
        )
    }

    /// Start a local job. Returns the job's cancel token.
    pub fn start_local(
        &self,
        request: LocalJobRequest,
        progress: Option<ProgressCallback>,
        on_complete: Option<CompletionCallback>,
    ) -> Result<CancelToken, WorkerError> {
        self.start(
            move |processor, cancel| processor.process_local(&request, progress, cancel),
            on_complete,
        )
    }

    /// Whether a job thread is still alive.
    ///
    /// Stays true while the completion callback runs.
    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|job| !job.handle.is_finished())
    }

    /// Request cancellation of the current job. Returns false if idle.
    pub fn cancel(&self) -> bool {
        match *self.current.lock() {
            Some(ref job) if !job.handle.is_finished() => {
                tracing::info!("Cancellation requested");
                job.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Block until the current job finishes and return its result.
    ///
    /// Returns `None` if no job was started since the last `wait`.
    pub fn wait(&self) -> Option<ProcessingResult> {
        let job = self.current.lock().take()?;
        Some(join_result(job.handle))
    }

    fn start<F>(&self, run: F, on_complete: Option<CompletionCallback>) -> Result<CancelToken, WorkerError>
    where
        F: FnOnce(&Processor, &CancelToken) -> ProcessingResult + Send + 'static,
    {
        let mut current = self.current.lock();

        if let Some(ref job) = *current {
            if !job.handle.is_finished() {
                return Err(WorkerError::Busy);
            }
        }
        if let Some(finished) = current.take() {
            let _ = join_result(finished.handle);
        }

        let cancel = CancelToken::new();
        let token = cancel.clone();
        let processor = Arc::clone(&self.processor);

        let handle = thread::Builder::new()
            .name("splyt-job".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| run(&processor, &token)))
                    .unwrap_or_else(|payload| {
                        ProcessingResult::failed(
                            "Processing failed",
                            panic_message(payload.as_ref()),
                        )
                    });

                if let Some(callback) = on_complete {
                    callback(&result);
                }
                result
            })
            .map_err(WorkerError::Spawn)?;

        *current = Some(RunningJob {
            cancel: cancel.clone(),
            handle,
        });
        Ok(cancel)
    }
}

fn join_result(handle: JoinHandle<ProcessingResult>) -> ProcessingResult {
    handle.join().unwrap_or_else(|payload| {
        ProcessingResult::failed("Processing failed", panic_message(payload.as_ref()))
    })
}
