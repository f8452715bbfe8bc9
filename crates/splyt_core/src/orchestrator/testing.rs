//! In-memory stage doubles shared by the orchestrator tests.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Settings;
use crate::logging::{JobLogger, LogConfig};
use crate::models::{AudioFile, AudioFormat, AudioSource, ProcessingProgress, SeparatedAudio};
use crate::stages::{locate_stems, stem_directory, AudioConverter, AudioDownloader, StemSeparator};

use super::errors::{StepError, StepResult};
use super::pipeline::CancelToken;
use super::types::{Context, Stages};

/// What a mock stage does when called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Behavior {
    #[default]
    Succeed,
    /// Fail like a tool exiting with this code.
    Fail(i32),
    /// Finish, but set the cancel token on the way out.
    CancelAfter,
    Panic,
}

fn act(behavior: Behavior, tool: &str, cancel: &CancelToken) -> StepResult<()> {
    match behavior {
        Behavior::Succeed => Ok(()),
        Behavior::Fail(code) => Err(StepError::command_failed(tool, code, "mock failure")),
        Behavior::CancelAfter => {
            cancel.cancel();
            Ok(())
        }
        Behavior::Panic => panic!("mock {} panicked", tool),
    }
}

#[derive(Default)]
pub struct MockDownloader {
    pub calls: AtomicUsize,
    pub behavior: Behavior,
}

impl AudioDownloader for MockDownloader {
    fn download(
        &self,
        source: &AudioSource,
        output_dir: &Path,
        format: AudioFormat,
        cancel: &CancelToken,
        _logger: &JobLogger,
    ) -> StepResult<AudioFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if source.is_local() {
            return Err(StepError::invalid_input("local source"));
        }
        act(self.behavior, "yt-dlp", cancel)?;

        let path = output_dir.join(format!("Mock Song.{}", format.extension()));
        fs::write(&path, b"downloaded").map_err(|e| StepError::io_error("mock download", e))?;
        Ok(AudioFile::new(path, format))
    }
}

#[derive(Default)]
pub struct MockConverter {
    pub calls: AtomicUsize,
    pub behavior: Behavior,
}

impl AudioConverter for MockConverter {
    fn convert(
        &self,
        input: &AudioFile,
        output_dir: &Path,
        format: AudioFormat,
        cancel: &CancelToken,
        _logger: &JobLogger,
    ) -> StepResult<AudioFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        act(self.behavior, "ffmpeg", cancel)?;

        if input.format == format && input.is_in_dir(output_dir) {
            return Ok(input.clone());
        }
        let path = output_dir.join(format!("{}.{}", input.stem(), format.extension()));
        fs::copy(&input.path, &path).map_err(|e| StepError::io_error("mock convert", e))?;
        Ok(AudioFile::new(path, format))
    }
}

#[derive(Default)]
pub struct MockSeparator {
    pub calls: AtomicUsize,
    pub behavior: Behavior,
}

impl StemSeparator for MockSeparator {
    fn separate(
        &self,
        input: &AudioFile,
        output_dir: &Path,
        cancel: &CancelToken,
        on_line: &mut dyn FnMut(&str),
        _logger: &JobLogger,
    ) -> StepResult<SeparatedAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        act(self.behavior, "demucs", cancel)?;

        let dir = self.stems_dir(input, output_dir);
        fs::create_dir_all(&dir).map_err(|e| StepError::io_error("mock separate", e))?;
        for name in ["vocals", "drums", "bass", "other"] {
            on_line(&format!(" 50%|##### | {}", name));
            fs::write(dir.join(format!("{}.wav", name)), b"stem")
                .map_err(|e| StepError::io_error("mock separate", e))?;
        }
        on_line("100%|##########|");
        Ok(locate_stems(output_dir, "htdemucs", &input.stem()))
    }

    fn stems_dir(&self, input: &AudioFile, output_dir: &Path) -> std::path::PathBuf {
        stem_directory(output_dir, "htdemucs", &input.stem())
    }
}

/// A set of mock stages with call counters.
#[derive(Clone, Default)]
pub struct MockStages {
    pub downloader: Arc<MockDownloader>,
    pub converter: Arc<MockConverter>,
    pub separator: Arc<MockSeparator>,
}

impl MockStages {
    pub fn with_download(mut self, behavior: Behavior) -> Self {
        self.downloader = Arc::new(MockDownloader {
            behavior,
            ..Default::default()
        });
        self
    }

    pub fn with_convert(mut self, behavior: Behavior) -> Self {
        self.converter = Arc::new(MockConverter {
            behavior,
            ..Default::default()
        });
        self
    }

    pub fn with_separate(mut self, behavior: Behavior) -> Self {
        self.separator = Arc::new(MockSeparator {
            behavior,
            ..Default::default()
        });
        self
    }

    pub fn stages(&self) -> Stages {
        Stages {
            downloader: self.downloader.clone(),
            converter: self.converter.clone(),
            separator: self.separator.clone(),
        }
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.downloader.calls.load(Ordering::SeqCst),
            self.converter.calls.load(Ordering::SeqCst),
            self.separator.calls.load(Ordering::SeqCst),
        )
    }
}

pub type ProgressLog = Arc<Mutex<Vec<ProcessingProgress>>>;

/// A context over mock stages whose progress reports are collected.
pub fn mock_context(dir: &Path, mocks: MockStages) -> (Context, ProgressLog) {
    let logger = JobLogger::new("mock_job", dir.join(".logs"), LogConfig::default(), None)
        .expect("create mock logger");
    let progress: ProgressLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&progress);

    let ctx = Context::new(
        Settings::default(),
        "mock_job",
        dir.to_path_buf(),
        Arc::new(logger),
        CancelToken::new(),
        mocks.stages(),
    )
    .with_progress_callback(Box::new(move |p: &ProcessingProgress| sink.lock().push(p.clone())));

    (ctx, progress)
}

/// A progress callback that records into a shared log.
pub fn recording_callback() -> (super::types::ProgressCallback, ProgressLog) {
    let progress: ProgressLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&progress);
    (Box::new(move |p: &ProcessingProgress| sink.lock().push(p.clone())), progress)
}
