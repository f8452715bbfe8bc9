//! SPLYT Core - Backend logic for the SPLYT stem splitter
//!
//! This crate drives yt-dlp, ffmpeg and demucs to turn a URL or a local
//! file into separated stems. It has zero UI dependencies and can be used
//! by a GUI application or the `splyt` CLI.

pub mod config;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod stages;
pub mod tools;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
