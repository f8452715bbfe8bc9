//! External tool plumbing: where the tools live and how they are run.

mod opener;
mod process;
mod resolver;

pub use opener::{file_manager_command, file_manager_program, open_in_file_manager};
pub use process::{run_to_completion, run_tool, OutputStream, ToolOutput};
pub use resolver::{bundle_resources_dir, Tool, ToolCommand, ToolResolver};
