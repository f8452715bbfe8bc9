//! ffmpeg backed converter.

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::ConversionSettings;
use crate::logging::JobLogger;
use crate::models::{AudioFile, AudioFormat};
use crate::orchestrator::{CancelToken, StepError, StepResult};
use crate::tools::{run_tool, Tool, ToolCommand};

use super::AudioConverter;

/// Converts audio with ffmpeg.
pub struct FfmpegConverter {
    command: ToolCommand,
    mp3_bitrate: String,
    poll_interval: Duration,
}

impl FfmpegConverter {
    pub fn new(command: ToolCommand) -> Self {
        Self {
            command,
            mp3_bitrate: "320k".to_string(),
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn from_settings(command: ToolCommand, settings: &ConversionSettings) -> Self {
        Self::new(command).with_mp3_bitrate(settings.mp3_bitrate.clone())
    }

    pub fn with_mp3_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.mp3_bitrate = bitrate.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn build_args(&self, input: &Path, output: &Path, format: AudioFormat) -> Vec<String> {
        let mut args = vec![
            "-nostdin".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-vn".to_string(),
            "-acodec".to_string(),
        ];

        match format {
            AudioFormat::Wav => args.push("pcm_s16le".to_string()),
            AudioFormat::Mp3 => {
                args.push("libmp3lame".to_string());
                args.push("-b:a".to_string());
                args.push(self.mp3_bitrate.clone());
            }
        }

        args.push(output.to_string_lossy().into_owned());
        args
    }
}

impl AudioConverter for FfmpegConverter {
    fn convert(
        &self,
        input: &AudioFile,
        output_dir: &Path,
        format: AudioFormat,
        cancel: &CancelToken,
        logger: &JobLogger,
    ) -> StepResult<AudioFile> {
        if !input.exists() {
            return Err(StepError::file_not_found(input.path.to_string_lossy()));
        }

        if input.format == format && input.is_in_dir(output_dir) {
            logger.debug(&format!(
                "{} is already {} in the output folder",
                input.file_name(),
                format
            ));
            return Ok(input.clone());
        }

        let output = output_dir.join(format!("{}.{}", input.stem(), format.extension()));
        if output.exists() {
            logger.skip(&format!(
                "{} already exists, skipping conversion",
                output.display()
            ));
            return Ok(AudioFile::new(output, format));
        }

        let args = self.build_args(&input.path, &output, format);
        logger.command(&self.command.display(&args));

        let result = run_tool(
            Tool::Ffmpeg,
            &self.command,
            &args,
            cancel,
            self.poll_interval,
            &mut |line, stream| logger.output_line(line, stream.is_stderr()),
        );

        let output_result = match result {
            Ok(output_result) => output_result,
            Err(e) => {
                if e.is_cancelled() && output.exists() {
                    logger.warn(&format!("Removing partial output {}", output.display()));
                    let _ = fs::remove_file(&output);
                }
                return Err(e);
            }
        };

        if !output_result.success() {
            logger.show_tail(Tool::Ffmpeg.name());
            return Err(StepError::command_failed(
                Tool::Ffmpeg.name(),
                output_result.exit_code,
                output_result.failure_message(),
            ));
        }

        if !output.exists() {
            return Err(StepError::file_not_found(output.to_string_lossy()));
        }

        logger.info(&format!("Converted to {}", output.display()));
        Ok(AudioFile::new(output, format))
    }
}
