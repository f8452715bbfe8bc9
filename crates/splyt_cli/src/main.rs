//! SPLYT - command-line entry point
//!
//! Loads configuration, initializes logging, runs one job on a background
//! worker and maps the outcome to an exit code. Typing `q` and Enter
//! cancels the running job.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use splyt_core::config::ConfigManager;
use splyt_core::logging::{init_tracing, LogLevel};
use splyt_core::models::{
    AudioFormat, LocalJobRequest, ProcessingProgress, ProcessingResult, ProcessingStatus,
    RemoteJobRequest,
};
use splyt_core::orchestrator::{CancelToken, JobWorker, Processor, ProgressCallback};
use splyt_core::tools::open_in_file_manager;

const EXIT_FAILED: u8 = 1;
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "splyt")]
#[command(about = "Download audio, convert it to WAV and split it into stems")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug output and every tool line
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the final result as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Open the output folder in the file manager when the job completes
    #[arg(long, global = true)]
    open: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download from a URL, convert and split
    Url {
        /// Video or audio page URL
        url: String,

        /// Output directory (defaults to the last one used)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Codec yt-dlp extracts into (wav, mp3)
        #[arg(long)]
        format: Option<AudioFormat>,

        /// Stop after conversion
        #[arg(long)]
        no_split: bool,
    },

    /// Convert and split a local audio file
    File {
        /// Audio file path
        path: PathBuf,

        /// Output directory (defaults to the last one used)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop after conversion
        #[arg(long)]
        no_split: bool,
    },
}

fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", "splyt")
        .map(|dirs| dirs.config_dir().join("splyt.toml"))
        .unwrap_or_else(|| PathBuf::from(".config").join("splyt.toml"))
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FAILED)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = ConfigManager::new(&config_path);
    config
        .load_or_create()
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.settings().logging.level
    };
    init_tracing(level);

    tracing::debug!("Config: {}", config_path.display());
    tracing::debug!("Core version: {}", splyt_core::version());

    let output = match cli.command {
        Commands::Url { ref output, .. } | Commands::File { ref output, .. } => output
            .clone()
            .unwrap_or_else(|| config.default_output_dir()),
    };

    config
        .ensure_dirs_exist(&output)
        .context("Failed to create output or log directories")?;
    if let Err(e) = config.remember_output_dir(&output) {
        tracing::warn!("Could not remember output folder: {}", e);
    }

    let mut settings = config.settings().clone();
    if cli.verbose {
        settings.logging.level = LogLevel::Debug;
        settings.logging.compact = false;
    }

    let mut processor = Processor::new(settings.clone(), config.logs_folder());
    if cli.verbose {
        processor = processor.with_log_sink(Arc::new(|line: &str| eprintln!("{}", line)));
    }
    let worker = JobWorker::new(processor);

    let cancel = match cli.command {
        Commands::Url {
            url,
            format,
            no_split,
            ..
        } => {
            let request = RemoteJobRequest::new(url, &output)
                .with_format(format.unwrap_or(settings.download.default_format))
                .with_split(!no_split && settings.download.should_split);
            worker.start_remote(request, Some(progress_printer()), None)?
        }
        Commands::File { path, no_split, .. } => {
            let request = LocalJobRequest::new(path, &output).with_split(!no_split);
            worker.start_local(request, Some(progress_printer()), None)?
        }
    };

    watch_stdin(cancel);

    let result = worker.wait().context("Job was never started")?;
    report(&result, cli.json)?;

    if cli.open && result.success {
        if let Err(e) = open_in_file_manager(&output) {
            tracing::warn!("Could not open {}: {}", output.display(), e);
        }
    }

    Ok(ExitCode::from(exit_status(&result)))
}

/// Process exit status for a finished job.
fn exit_status(result: &ProcessingResult) -> u8 {
    match result.status {
        ProcessingStatus::Completed => 0,
        ProcessingStatus::Cancelled => EXIT_CANCELLED,
        _ => EXIT_FAILED,
    }
}

fn progress_printer() -> ProgressCallback {
    Box::new(|progress: &ProcessingProgress| {
        eprintln!("[{:>3}%] {}", progress.percentage, progress.message);
    })
}

/// Cancel the job when the user types `q`.
fn watch_stdin(cancel: CancelToken) {
    eprintln!("Type q + Enter to cancel.");
    let spawned = thread::Builder::new()
        .name("stdin-cancel".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().eq_ignore_ascii_case("q") {
                    eprintln!("Cancelling...");
                    cancel.cancel();
                    break;
                }
            }
        });

    if let Err(e) = spawned {
        tracing::warn!("Cancel via stdin unavailable: {}", e);
    }
}

fn report(result: &ProcessingResult, json: bool) -> Result<()> {
    if json {
        write_json(&mut io::stdout().lock(), result)?;
        return Ok(());
    }

    match result.status {
        ProcessingStatus::Completed => {
            println!("{}", result.message);
            if let Some(ref path) = result.output_path {
                println!("Output: {}", path.display());
            }
        }
        _ => {
            eprintln!("{}", result.message);
            if let Some(ref error) = result.error {
                eprintln!("{}", error);
            }
        }
    }
    Ok(())
}

fn write_json(out: &mut impl Write, result: &ProcessingResult) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, result)?;
    writeln!(out)?;
    Ok(())
}
