//! Cancellable subprocess runner.
//!
//! stdout and stderr are drained by reader threads into a channel. The
//! calling thread receives lines with a timeout equal to the poll interval,
//! so it can check `try_wait` and the cancel token between lines.

use std::io::{BufReader, Read};
use std::process::{Child, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};

use super::resolver::{Tool, ToolCommand};
use crate::orchestrator::{CancelToken, StepError, StepResult};

/// Number of output lines quoted in a failure message.
const FAILURE_TAIL_LINES: usize = 10;

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn is_stderr(&self) -> bool {
        matches!(self, OutputStream::Stderr)
    }
}

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, or -1 when the process was killed by a signal.
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last non-empty stdout line, trimmed.
    pub fn last_stdout_line(&self) -> Option<&str> {
        self.stdout
            .iter()
            .rev()
            .map(|line| line.trim())
            .find(|line| !line.is_empty())
    }

    /// Tail of stderr (or stdout when stderr is empty) for error messages.
    pub fn failure_message(&self) -> String {
        let source = if self.stderr.iter().any(|l| !l.trim().is_empty()) {
            &self.stderr
        } else {
            &self.stdout
        };

        let lines: Vec<&str> = source
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        if lines.is_empty() {
            return "no output".to_string();
        }

        let start = lines.len().saturating_sub(FAILURE_TAIL_LINES);
        lines[start..].join("\n")
    }

    fn record(&mut self, stream: OutputStream, line: String) {
        match stream {
            OutputStream::Stdout => self.stdout.push(line),
            OutputStream::Stderr => self.stderr.push(line),
        }
    }
}

/// Run `command args…` to completion.
///
/// Every output line is handed to `on_line` on the calling thread as it
/// arrives. When `cancel` is set the child is killed and
/// `StepError::Cancelled` is returned. A spawn failure with `NotFound`
/// becomes `StepError::ToolNotFound`. A non-zero exit is NOT an error here;
/// callers inspect [`ToolOutput::exit_code`].
pub fn run_tool(
    tool: Tool,
    command: &ToolCommand,
    args: &[String],
    cancel: &CancelToken,
    poll_interval: Duration,
    on_line: &mut dyn FnMut(&str, OutputStream),
) -> StepResult<ToolOutput> {
    if cancel.is_cancelled() {
        return Err(StepError::cancelled(tool.name()));
    }

    let mut cmd = command.to_command();
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StepError::tool_not_found(tool.name(), command.program.to_string_lossy(), e)
        } else {
            StepError::io_error(format!("spawning {}", tool), e)
        }
    })?;

    tracing::debug!("Spawned {} (pid {})", tool, child.id());

    let (tx, rx) = crossbeam_channel::unbounded::<(OutputStream, String)>();
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, OutputStream::Stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, OutputStream::Stderr, tx.clone()));
    }
    drop(tx);

    let mut output = ToolOutput::default();
    let mut readers_done = false;

    let status = loop {
        if readers_done {
            thread::sleep(poll_interval);
        } else {
            match rx.recv_timeout(poll_interval) {
                Ok((stream, line)) => {
                    on_line(&line, stream);
                    output.record(stream, line);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => readers_done = true,
            }
        }

        if cancel.is_cancelled() {
            tracing::info!("Cancelling {} (pid {})", tool, child.id());
            kill_child(&mut child);
            return Err(StepError::cancelled(tool.name()));
        }

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                kill_child(&mut child);
                return Err(StepError::io_error(format!("waiting for {}", tool), e));
            }
        }
    };

    // A background grandchild may still hold the pipes open after the
    // child exits, so draining stays cancellable.
    while !readers_done {
        match rx.recv_timeout(poll_interval) {
            Ok((stream, line)) => {
                on_line(&line, stream);
                output.record(stream, line);
            }
            Err(RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() {
                    tracing::info!("Cancelled while {} output was still open", tool);
                    return Err(StepError::cancelled(tool.name()));
                }
            }
            Err(RecvTimeoutError::Disconnected) => readers_done = true,
        }
    }
    for reader in readers {
        let _ = reader.join();
    }

    output.exit_code = status.code().unwrap_or(-1);
    tracing::debug!("{} exited with code {}", tool, output.exit_code);

    Ok(output)
}

/// Run without a line callback.
pub fn run_to_completion(
    tool: Tool,
    command: &ToolCommand,
    args: &[String],
    cancel: &CancelToken,
    poll_interval: Duration,
) -> StepResult<ToolOutput> {
    run_tool(tool, command, args, cancel, poll_interval, &mut |_, _| {})
}

fn kill_child(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Forward lines from `pipe` into `tx`. Both `\n` and `\r` end a line,
/// so carriage-return progress bars arrive as separate updates.
fn spawn_reader<R: Read + Send + 'static>(
    pipe: R,
    stream: OutputStream,
    tx: Sender<(OutputStream, String)>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        for byte in BufReader::new(pipe).bytes() {
            let Ok(byte) = byte else { break };
            if byte == b'\n' || byte == b'\r' {
                if !buf.is_empty() {
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    buf.clear();
                    if tx.send((stream, line)).is_err() {
                        return;
                    }
                }
            } else {
                buf.push(byte);
            }
        }
        if !buf.is_empty() {
            let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Instant;
    use tempfile::tempdir;

    fn sh_script(dir: &std::path::Path, body: &str) -> ToolCommand {
        let script = dir.join("tool.sh");
        fs::write(&script, body).unwrap();
        ToolCommand::new("sh").arg(script.to_string_lossy())
    }

    const POLL: Duration = Duration::from_millis(10);

    #[test]
    fn captures_both_streams() {
        let dir = tempdir().unwrap();
        let cmd = sh_script(dir.path(), "echo out1\necho err1 >&2\necho out2\n");

        let mut seen = Vec::new();
        let output = run_tool(
            Tool::Ffmpeg,
            &cmd,
            &[],
            &CancelToken::new(),
            POLL,
            &mut |line, stream| seen.push((line.to_string(), stream)),
        )
        .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, vec!["out1", "out2"]);
        assert_eq!(output.stderr, vec!["err1"]);
        assert_eq!(output.last_stdout_line(), Some("out2"));
        assert_eq!(seen.len(), 3);
        assert!(seen.contains(&("err1".to_string(), OutputStream::Stderr)));
    }

    #[test]
    fn splits_carriage_return_updates() {
        let dir = tempdir().unwrap();
        let cmd = sh_script(dir.path(), "printf ' 10%%|#\\r 50%%|##\\r100%%|###\\n' >&2\n");

        let output = run_to_completion(Tool::Demucs, &cmd, &[], &CancelToken::new(), POLL).unwrap();
        assert_eq!(output.stderr, vec![" 10%|#", " 50%|##", "100%|###"]);
    }

    #[test]
    fn reports_nonzero_exit() {
        let dir = tempdir().unwrap();
        let cmd = sh_script(dir.path(), "echo 'ERROR: Unsupported URL' >&2\nexit 3\n");

        let output = run_to_completion(Tool::YtDlp, &cmd, &[], &CancelToken::new(), POLL).unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.failure_message(), "ERROR: Unsupported URL");
    }

    #[test]
    fn passes_arguments() {
        let dir = tempdir().unwrap();
        let cmd = sh_script(dir.path(), "echo \"$1|$2\"\n");

        let output = run_to_completion(
            Tool::Ffmpeg,
            &cmd,
            &["-i".to_string(), "a b.mp3".to_string()],
            &CancelToken::new(),
            POLL,
        )
        .unwrap();
        assert_eq!(output.last_stdout_line(), Some("-i|a b.mp3"));
    }

    #[test]
    fn missing_program_is_tool_not_found() {
        let cmd = ToolCommand::new("/nonexistent/splyt-test-tool");
        let err = run_to_completion(Tool::Demucs, &cmd, &[], &CancelToken::new(), POLL).unwrap_err();
        assert!(matches!(err, StepError::ToolNotFound { .. }));
    }

    #[test]
    fn cancel_kills_running_child() {
        let dir = tempdir().unwrap();
        let cmd = sh_script(dir.path(), "exec sleep 30\n");
        let cancel = CancelToken::new();

        let trigger = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            trigger.cancel();
        });

        let started = Instant::now();
        let err = run_to_completion(Tool::YtDlp, &cmd, &[], &cancel, POLL).unwrap_err();
        canceller.join().unwrap();

        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn cancel_while_grandchild_holds_output() {
        let dir = tempdir().unwrap();
        let cmd = sh_script(dir.path(), "sleep 30 &\necho done\nexit 0\n");
        let cancel = CancelToken::new();

        let trigger = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            trigger.cancel();
        });

        let started = Instant::now();
        let err = run_to_completion(Tool::YtDlp, &cmd, &[], &cancel, POLL).unwrap_err();
        canceller.join().unwrap();

        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn already_cancelled_never_spawns() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("ran");
        let cmd = sh_script(dir.path(), &format!("touch '{}'\n", marker.display()));
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = run_to_completion(Tool::Ffmpeg, &cmd, &[], &cancel, POLL).unwrap_err();
        assert!(err.is_cancelled());
        assert!(!marker.exists());
    }
}
