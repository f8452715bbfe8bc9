//! demucs backed stem separator.
//!
//! demucs writes `<out>/<model>/<track>/{vocals,drums,bass,other}.wav`.
//! That layout is known only to [`stem_directory`] and [`locate_stems`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::SeparationSettings;
use crate::logging::JobLogger;
use crate::models::{AudioFile, AudioFormat, SeparatedAudio, StemKind};
use crate::orchestrator::{CancelToken, StepError, StepResult};
use crate::tools::{run_tool, Tool, ToolCommand};

use super::StemSeparator;

/// Directory holding the stems of `track` separated with `model`.
pub fn stem_directory(output_dir: &Path, model: &str, track: &str) -> PathBuf {
    output_dir.join(model).join(track)
}

/// Collect whichever stems exist. Missing stems are `None`.
pub fn locate_stems(output_dir: &Path, model: &str, track: &str) -> SeparatedAudio {
    let dir = stem_directory(output_dir, model, track);
    let mut separated = SeparatedAudio::default();

    for kind in StemKind::ALL {
        let path = dir.join(kind.file_name());
        if path.is_file() {
            separated.set(kind, Some(AudioFile::new(path, AudioFormat::Wav)));
        }
    }

    separated
}

/// Percentage from a tqdm progress line such as ` 45%|████▌  | 5.85/13.0`.
pub fn parse_progress_percent(line: &str) -> Option<u32> {
    let idx = line.find("%|")?;
    let digits: String = line[..idx]
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    digits.parse::<u32>().ok().filter(|p| *p <= 100)
}

/// Separates stems with demucs on the CPU.
pub struct DemucsSeparator {
    command: ToolCommand,
    model: String,
    device: String,
    poll_interval: Duration,
}

impl DemucsSeparator {
    pub fn new(command: ToolCommand) -> Self {
        Self {
            command,
            model: "htdemucs".to_string(),
            device: "cpu".to_string(),
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn from_settings(command: ToolCommand, settings: &SeparationSettings) -> Self {
        Self::new(command).with_model(settings.model.clone())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn build_args(&self, input: &Path, output_dir: &Path) -> Vec<String> {
        vec![
            "-n".to_string(),
            self.model.clone(),
            "-o".to_string(),
            output_dir.to_string_lossy().into_owned(),
            "-d".to_string(),
            self.device.clone(),
            input.to_string_lossy().into_owned(),
        ]
    }
}

impl StemSeparator for DemucsSeparator {
    fn separate(
        &self,
        input: &AudioFile,
        output_dir: &Path,
        cancel: &CancelToken,
        on_line: &mut dyn FnMut(&str),
        logger: &JobLogger,
    ) -> StepResult<SeparatedAudio> {
        if !input.exists() {
            return Err(StepError::file_not_found(input.path.to_string_lossy()));
        }

        let args = self.build_args(&input.path, output_dir);
        logger.command(&self.command.display(&args));

        let output = run_tool(
            Tool::Demucs,
            &self.command,
            &args,
            cancel,
            self.poll_interval,
            &mut |line, stream| {
                logger.output_line(line, stream.is_stderr());
                on_line(line);
            },
        )?;

        if !output.success() {
            logger.show_tail(Tool::Demucs.name());
            return Err(StepError::command_failed(
                Tool::Demucs.name(),
                output.exit_code,
                output.failure_message(),
            ));
        }

        let separated = locate_stems(output_dir, &self.model, &input.stem());
        if separated.stem_count() < StemKind::ALL.len() {
            logger.warn(&format!(
                "Only {} of {} stems found in {}",
                separated.stem_count(),
                StemKind::ALL.len(),
                self.stems_dir(input, output_dir).display()
            ));
        }

        Ok(separated)
    }

    fn stems_dir(&self, input: &AudioFile, output_dir: &Path) -> PathBuf {
        stem_directory(output_dir, &self.model, &input.stem())
    }
}
