//! Configuration management for SPLYT.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use splyt_core::config::{ConfigManager, ConfigSection};
//! use splyt_core::models::AudioFormat;
//!
//! let mut config = ConfigManager::new(".config/splyt.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Output folder: {}", config.settings().paths.output_folder);
//!
//! config.settings_mut().download.default_format = AudioFormat::Mp3;
//! config.update_section(ConfigSection::Download).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, ConversionSettings, DemucsLauncher, DownloadSettings, LoggingSettings,
    PathSettings, SeparationSettings, Settings, ToolSettings, OUTPUT_FOLDER_NAME,
};
