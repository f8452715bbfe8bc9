//! Data models for SPLYT.
//!
//! This module contains the plain records the pipeline passes around:
//! - Enums for audio formats, stems and job status
//! - Sources, audio files and separated stems
//! - Job requests, the job record, progress and results

mod enums;
mod jobs;
mod media;

use std::path::PathBuf;

use thiserror::Error;

pub use enums::{AudioFormat, ProcessingStatus, StemKind};
pub use jobs::{
    LocalJobRequest, ProcessingJob, ProcessingProgress, ProcessingResult, RemoteJobRequest,
};
pub use media::{AudioFile, AudioSource, SeparatedAudio};

/// Errors raised while constructing or mutating models.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Local file does not exist: {}", .0.display())]
    LocalFileMissing(PathBuf),

    #[error("Source URL is empty")]
    EmptyUrl,

    #[error("Unknown audio format '{0}' (expected wav or mp3)")]
    UnknownFormat(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ProcessingStatus,
        to: ProcessingStatus,
    },
}
