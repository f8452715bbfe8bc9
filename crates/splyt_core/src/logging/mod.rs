//! Logging infrastructure for SPLYT.
//!
//! This module provides:
//! - Per-job loggers with file + callback dual output
//! - Compact mode that keeps tool output in a tail buffer
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use splyt_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("my_job", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.phase("Convert");
//! logger.command("ffmpeg -i song.mp3 -vn -acodec pcm_s16le song.wav");
//! logger.progress(40);
//! logger.success("Job completed");
//! ```

mod job_logger;
mod types;

pub use job_logger::{JobLogger, JobLoggerBuilder};
pub(crate) use job_logger::sanitize_filename;
pub use types::{GuiLogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG`, falling back to `default_level`, and writes to stderr.
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
