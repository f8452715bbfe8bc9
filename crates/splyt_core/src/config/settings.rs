//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::AudioFormat;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Download stage settings.
    #[serde(default)]
    pub download: DownloadSettings,

    /// Conversion stage settings.
    #[serde(default)]
    pub conversion: ConversionSettings,

    /// Separation stage settings.
    #[serde(default)]
    pub separation: SeparationSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,
}

/// Path configuration for output and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Default output folder for downloads, conversions and stems.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Folder for per-job log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Last output directory used; preferred over `output_folder` when set.
    #[serde(default)]
    pub last_output_dir: String,
}

/// Folder name for results, placed in the user's Documents folder.
pub const OUTPUT_FOLDER_NAME: &str = "Demucs_Cuts";

fn default_output_folder() -> String {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|docs| docs.join(OUTPUT_FOLDER_NAME)))
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| OUTPUT_FOLDER_NAME.to_string())
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            logs_folder: default_logs_folder(),
            last_output_dir: String::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level for the global tracing subscriber.
    #[serde(default)]
    pub level: LogLevel,

    /// Keep tool output in the tail buffer only.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines to show after a failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Log every external command line before running it.
    #[serde(default = "default_true")]
    pub show_tool_commands: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_tool_commands: true,
        }
    }
}

/// Download stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Codec yt-dlp extracts into when none is requested.
    #[serde(default)]
    pub default_format: AudioFormat,

    /// Split into stems unless told otherwise.
    #[serde(default = "default_true")]
    pub should_split: bool,

    /// Interval between subprocess exit checks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay between checks for the downloaded file to appear.
    #[serde(default = "default_file_wait_delay_ms")]
    pub file_wait_delay_ms: u64,

    /// Maximum number of checks for the downloaded file.
    #[serde(default = "default_file_wait_max_retries")]
    pub file_wait_max_retries: u32,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_file_wait_delay_ms() -> u64 {
    500
}

fn default_file_wait_max_retries() -> u32 {
    100
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            default_format: AudioFormat::Wav,
            should_split: true,
            poll_interval_ms: default_poll_interval_ms(),
            file_wait_delay_ms: default_file_wait_delay_ms(),
            file_wait_max_retries: default_file_wait_max_retries(),
        }
    }
}

/// Conversion stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Bitrate passed to ffmpeg when encoding MP3.
    #[serde(default = "default_mp3_bitrate")]
    pub mp3_bitrate: String,
}

fn default_mp3_bitrate() -> String {
    "320k".to_string()
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            mp3_bitrate: default_mp3_bitrate(),
        }
    }
}

/// How the separation tool is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DemucsLauncher {
    /// Run the `demucs` executable.
    #[default]
    Executable,
    /// Run `<python> -m demucs.separate`.
    PythonModule,
}

/// Separation stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparationSettings {
    /// Model name; also the first directory level of the stem output.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub launcher: DemucsLauncher,

    /// Interpreter used with the `python-module` launcher.
    #[serde(default = "default_python")]
    pub python: String,
}

fn default_model() -> String {
    "htdemucs".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

impl Default for SeparationSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            launcher: DemucsLauncher::default(),
            python: default_python(),
        }
    }
}

/// Explicit tool locations. Empty values are resolved automatically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default)]
    pub yt_dlp: String,

    #[serde(default)]
    pub ffmpeg: String,

    #[serde(default)]
    pub demucs: String,

    /// Force bundled mode with tools in this directory.
    #[serde(default)]
    pub resources_dir: String,
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Download,
    Conversion,
    Separation,
    Tools,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Download,
        ConfigSection::Conversion,
        ConfigSection::Separation,
        ConfigSection::Tools,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Download => "download",
            ConfigSection::Conversion => "conversion",
            ConfigSection::Separation => "separation",
            ConfigSection::Tools => "tools",
        }
    }

    /// Comment written above the section in a fresh config file.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output and log directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Download => "Download stage (yt-dlp)",
            ConfigSection::Conversion => "Conversion stage (ffmpeg)",
            ConfigSection::Separation => "Separation stage (demucs)",
            ConfigSection::Tools => "Tool locations (empty = bundled resources or PATH)",
        }
    }
}
