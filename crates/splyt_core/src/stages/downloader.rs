//! yt-dlp backed downloader.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::config::DownloadSettings;
use crate::logging::JobLogger;
use crate::models::{AudioFile, AudioFormat, AudioSource};
use crate::orchestrator::{CancelToken, StepError, StepResult};
use crate::tools::{run_tool, Tool, ToolCommand, ToolOutput};

use super::AudioDownloader;

/// Bounded wait for a downloaded file to become visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileWait {
    pub delay: Duration,
    pub max_retries: u32,
}

impl Default for FileWait {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            max_retries: 100,
        }
    }
}

/// Downloads remote audio with yt-dlp, extracting it to the requested codec.
pub struct YtDlpDownloader {
    command: ToolCommand,
    poll_interval: Duration,
    file_wait: FileWait,
}

impl YtDlpDownloader {
    pub fn new(command: ToolCommand) -> Self {
        Self {
            command,
            poll_interval: Duration::from_millis(100),
            file_wait: FileWait::default(),
        }
    }

    pub fn from_settings(command: ToolCommand, settings: &DownloadSettings) -> Self {
        Self {
            command,
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
            file_wait: FileWait {
                delay: Duration::from_millis(settings.file_wait_delay_ms),
                max_retries: settings.file_wait_max_retries,
            },
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_file_wait(mut self, file_wait: FileWait) -> Self {
        self.file_wait = file_wait;
        self
    }

    /// Arguments for the real download.
    pub fn build_args(url: &str, output_dir: &Path, format: AudioFormat) -> Vec<String> {
        let template = output_dir.join("%(title)s.%(ext)s");
        vec![
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            format.extension().to_string(),
            "--no-playlist".to_string(),
            url.to_string(),
        ]
    }

    /// Ask yt-dlp where the file will land, without downloading.
    ///
    /// yt-dlp reports the pre-extraction extension, so it is swapped for the
    /// codec's.
    pub fn resolve_filename(
        &self,
        url: &str,
        output_dir: &Path,
        format: AudioFormat,
        cancel: &CancelToken,
        logger: &JobLogger,
    ) -> StepResult<PathBuf> {
        let mut args = Self::build_args(url, output_dir, format);
        args.push("--get-filename".to_string());

        logger.command(&self.command.display(&args));
        let output = self.run(&args, cancel, logger)?;
        self.check_exit(&output, logger)?;

        let line = output.last_stdout_line().ok_or_else(|| {
            StepError::invalid_output(format!("{} printed no filename for {}", Tool::YtDlp, url))
        })?;

        Ok(PathBuf::from(line).with_extension(format.extension()))
    }

    /// Poll until `path` exists, giving up after the configured retries.
    pub fn wait_for_file(&self, path: &Path, cancel: &CancelToken) -> StepResult<()> {
        let attempts = self.file_wait.max_retries.max(1);

        for attempt in 1..=attempts {
            if path.exists() {
                if attempt > 1 {
                    tracing::debug!("{} visible after {} checks", path.display(), attempt);
                }
                return Ok(());
            }
            if cancel.is_cancelled() {
                return Err(StepError::cancelled("waiting for download"));
            }
            if attempt < attempts {
                thread::sleep(self.file_wait.delay);
            }
        }

        Err(StepError::output_not_visible(
            path.to_string_lossy(),
            attempts,
        ))
    }

    fn run(&self, args: &[String], cancel: &CancelToken, logger: &JobLogger) -> StepResult<ToolOutput> {
        run_tool(
            Tool::YtDlp,
            &self.command,
            args,
            cancel,
            self.poll_interval,
            &mut |line, stream| logger.output_line(line, stream.is_stderr()),
        )
    }

    fn check_exit(&self, output: &ToolOutput, logger: &JobLogger) -> StepResult<()> {
        if output.success() {
            return Ok(());
        }
        logger.show_tail(Tool::YtDlp.name());
        Err(StepError::command_failed(
            Tool::YtDlp.name(),
            output.exit_code,
            output.failure_message(),
        ))
    }
}

impl AudioDownloader for YtDlpDownloader {
    fn download(
        &self,
        source: &AudioSource,
        output_dir: &Path,
        format: AudioFormat,
        cancel: &CancelToken,
        logger: &JobLogger,
    ) -> StepResult<AudioFile> {
        let url = match source {
            AudioSource::Remote { url } => url,
            AudioSource::Local { path } => {
                return Err(StepError::invalid_input(format!(
                    "Cannot download a local file: {}",
                    path.display()
                )));
            }
        };

        let target = self.resolve_filename(url, output_dir, format, cancel, logger)?;
        if target.exists() {
            logger.skip(&format!(
                "{} already exists, skipping download",
                target.display()
            ));
            return Ok(AudioFile::new(target, format));
        }

        let args = Self::build_args(url, output_dir, format);
        logger.command(&self.command.display(&args));
        let output = self.run(&args, cancel, logger)?;
        self.check_exit(&output, logger)?;

        self.wait_for_file(&target, cancel)?;
        logger.info(&format!("Downloaded {}", target.display()));

        Ok(AudioFile::new(target, format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use std::fs;
    use tempfile::tempdir;

    fn logger(dir: &Path) -> JobLogger {
        JobLogger::new("download_test", dir.join("logs"), LogConfig::default(), None).unwrap()
    }

    /// Fake yt-dlp: prints `<out>/Test Song.webm` for `--get-filename`,
    /// otherwise writes `<out>/Test Song.<codec>` and records the call.
    fn fake_ytdlp(dir: &Path) -> ToolCommand {
        let script = dir.join("yt-dlp.sh");
        let calls = dir.join("download_calls");
        fs::write(
            &script,
            format!(
                r#"out=""; codec=""; get=0
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift ;;
    --audio-format) codec="$2"; shift ;;
    --get-filename) get=1 ;;
  esac
  shift
done
dir=$(dirname "$out")
if [ $get = 1 ]; then echo "$dir/Test Song.webm"; exit 0; fi
echo download >> '{}'
echo "[download] 100%"
: > "$dir/Test Song.$codec"
"#,
                calls.display()
            ),
        )
        .unwrap();
        ToolCommand::new("sh").arg(script.to_string_lossy())
    }

    fn fast(downloader: YtDlpDownloader) -> YtDlpDownloader {
        downloader
            .with_poll_interval(Duration::from_millis(10))
            .with_file_wait(FileWait {
                delay: Duration::from_millis(10),
                max_retries: 5,
            })
    }

    #[test]
    fn builds_expected_arguments() {
        let args = YtDlpDownloader::build_args("https://e.com/v", Path::new("/out"), AudioFormat::Mp3);
        assert_eq!(
            args,
            vec![
                "--format",
                "bestaudio/best",
                "--output",
                "/out/%(title)s.%(ext)s",
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--no-playlist",
                "https://e.com/v",
            ]
        );
    }

    #[test]
    fn rejects_local_source() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("song.mp3");
        fs::write(&file, b"x").unwrap();

        let downloader = YtDlpDownloader::new(ToolCommand::new("yt-dlp"));
        let err = downloader
            .download(
                &AudioSource::local(&file).unwrap(),
                dir.path(),
                AudioFormat::Wav,
                &CancelToken::new(),
                &logger(dir.path()),
            )
            .unwrap_err();
        assert!(matches!(err, StepError::InvalidInput(_)));
    }

    #[cfg(unix)]
    #[test]
    fn downloads_and_swaps_extension() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();

        let downloader = fast(YtDlpDownloader::new(fake_ytdlp(dir.path())));
        let file = downloader
            .download(
                &AudioSource::remote("https://e.com/v/1").unwrap(),
                &out,
                AudioFormat::Wav,
                &CancelToken::new(),
                &logger(dir.path()),
            )
            .unwrap();

        assert_eq!(file.path, out.join("Test Song.wav"));
        assert_eq!(file.format, AudioFormat::Wav);
        assert!(file.exists());
        assert_eq!(fs::read_to_string(dir.path().join("download_calls")).unwrap().lines().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn skips_when_file_already_present() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("Test Song.mp3"), b"existing").unwrap();

        let downloader = fast(YtDlpDownloader::new(fake_ytdlp(dir.path())));
        let file = downloader
            .download(
                &AudioSource::remote("https://e.com/v/1").unwrap(),
                &out,
                AudioFormat::Mp3,
                &CancelToken::new(),
                &logger(dir.path()),
            )
            .unwrap();

        assert_eq!(file.path, out.join("Test Song.mp3"));
        assert!(!dir.path().join("download_calls").exists());
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_command_failed() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("fail.sh");
        fs::write(&script, "echo 'ERROR: Unsupported URL' >&2\nexit 1\n").unwrap();

        let downloader = fast(YtDlpDownloader::new(
            ToolCommand::new("sh").arg(script.to_string_lossy()),
        ));
        let err = downloader
            .download(
                &AudioSource::remote("https://e.com/nope").unwrap(),
                dir.path(),
                AudioFormat::Wav,
                &CancelToken::new(),
                &logger(dir.path()),
            )
            .unwrap_err();

        assert_eq!(err.exit_code(), Some(1));
        assert!(err.to_string().contains("Unsupported URL"));
    }

    #[test]
    fn wait_for_file_gives_up() {
        let dir = tempdir().unwrap();
        let downloader = fast(YtDlpDownloader::new(ToolCommand::new("yt-dlp")));

        let err = downloader
            .wait_for_file(&dir.path().join("never.wav"), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, StepError::OutputNotVisible { attempts: 5, .. }));
    }

    #[test]
    fn wait_for_file_stops_on_cancel() {
        let dir = tempdir().unwrap();
        let downloader = fast(YtDlpDownloader::new(ToolCommand::new("yt-dlp")));
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = downloader
            .wait_for_file(&dir.path().join("never.wav"), &cancel)
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
