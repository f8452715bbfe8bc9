//! Locating the external tools.
//!
//! Resolution never fails: a tool that cannot be found surfaces later when
//! spawning it returns `NotFound`.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{DemucsLauncher, Settings};

/// External programs the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    YtDlp,
    Ffmpeg,
    Demucs,
}

impl Tool {
    /// Executable name, also the file name inside a bundle.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::YtDlp => "yt-dlp",
            Tool::Ffmpeg => "ffmpeg",
            Tool::Demucs => "demucs",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An invocable command: a program plus leading arguments.
///
/// `python3 -m demucs.separate` is `program = python3`,
/// `prefix_args = ["-m", "demucs.separate"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub prefix_args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    /// Append a leading argument (builder pattern).
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.prefix_args.push(arg.into());
        self
    }

    /// A `Command` with the prefix arguments already applied.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix_args);
        cmd
    }

    /// Shell-like rendering of the full command line, for logs.
    pub fn display(&self, args: &[String]) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.prefix_args.iter().cloned())
            .chain(args.iter().cloned())
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("\"{}\"", part)
                } else {
                    part
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Maps each [`Tool`] to the command that runs it.
///
/// Priority: explicit override, then the bundle resources directory,
/// then the bare tool name (looked up on `PATH` at spawn time).
#[derive(Debug, Clone, Default)]
pub struct ToolResolver {
    resources_dir: Option<PathBuf>,
    overrides: HashMap<Tool, ToolCommand>,
}

impl ToolResolver {
    /// Resolver with no bundle and no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detect whether we are running from an application bundle.
    pub fn detect() -> Self {
        let resources_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| bundle_resources_dir(&exe));

        if let Some(ref dir) = resources_dir {
            tracing::debug!("Running from bundle, resources at {}", dir.display());
        }

        Self {
            resources_dir,
            overrides: HashMap::new(),
        }
    }

    /// Detect, then apply `[tools]` and `[separation]` settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut resolver = Self::detect();
        let tools = &settings.tools;

        if !tools.resources_dir.is_empty() {
            resolver.resources_dir = Some(PathBuf::from(&tools.resources_dir));
        }

        if settings.separation.launcher == DemucsLauncher::PythonModule {
            resolver.overrides.insert(
                Tool::Demucs,
                ToolCommand::new(&settings.separation.python)
                    .arg("-m")
                    .arg("demucs.separate"),
            );
        }

        for (tool, value) in [
            (Tool::YtDlp, &tools.yt_dlp),
            (Tool::Ffmpeg, &tools.ffmpeg),
            (Tool::Demucs, &tools.demucs),
        ] {
            if !value.is_empty() {
                resolver.overrides.insert(tool, ToolCommand::new(value));
            }
        }

        resolver
    }

    pub fn with_override(mut self, tool: Tool, command: ToolCommand) -> Self {
        self.overrides.insert(tool, command);
        self
    }

    pub fn with_resources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resources_dir = Some(dir.into());
        self
    }

    pub fn is_bundled(&self) -> bool {
        self.resources_dir.is_some()
    }

    pub fn resources_dir(&self) -> Option<&Path> {
        self.resources_dir.as_deref()
    }

    pub fn resolve(&self, tool: Tool) -> ToolCommand {
        if let Some(command) = self.overrides.get(&tool) {
            return command.clone();
        }

        match self.resources_dir {
            Some(ref dir) => ToolCommand::new(dir.join(tool.name())),
            None => ToolCommand::new(tool.name()),
        }
    }
}

/// `<X>.app/Contents/Resources` for an executable at `<X>.app/Contents/MacOS/<bin>`.
pub fn bundle_resources_dir(exe: &Path) -> Option<PathBuf> {
    let macos = exe.parent()?;
    if macos.file_name()? != "MacOS" {
        return None;
    }

    let contents = macos.parent()?;
    if contents.file_name()? != "Contents" {
        return None;
    }

    let app = contents.parent()?;
    if app.extension()? != "app" {
        return None;
    }

    Some(contents.join("Resources"))
}
