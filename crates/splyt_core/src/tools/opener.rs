//! Reveal a folder in the platform file manager.

use std::io;
use std::path::Path;
use std::process::Stdio;

use super::resolver::ToolCommand;

/// File manager launcher for the current platform.
pub fn file_manager_program() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}

/// Command that opens `dir` in the file manager.
pub fn file_manager_command(dir: &Path) -> ToolCommand {
    ToolCommand::new(file_manager_program()).arg(dir.to_string_lossy())
}

/// Open `dir` without waiting for the file manager to exit.
pub fn open_in_file_manager(dir: &Path) -> io::Result<()> {
    if !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", dir.display()),
        ));
    }

    let command = file_manager_command(dir);
    tracing::debug!("Opening {}", command.display(&[]));
    command
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn command_targets_the_folder() {
        let cmd = file_manager_command(Path::new("/music/Demucs Cuts"));
        assert_eq!(cmd.program, PathBuf::from(file_manager_program()));
        assert_eq!(cmd.prefix_args, vec!["/music/Demucs Cuts".to_string()]);
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn uses_xdg_open_on_linux() {
        assert_eq!(file_manager_program(), "xdg-open");
    }

    #[test]
    fn missing_folder_is_not_opened() {
        let err = open_in_file_manager(Path::new("/nonexistent/splyt/out")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
