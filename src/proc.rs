//! Small helpers for invoking the runtime's collaborator commands.

use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Build a command from a configured argv, anchored to an explicit
/// working directory. Relative programs with a path separator
/// (`./python`) are resolved against `cwd` instead of relying on the
/// child's post-chdir lookup; bare names (`make`) stay PATH-resolved.
///
/// The argv must be non-empty; callers validate their configuration
/// before getting here.
pub(crate) fn command_in(argv: &[String], cwd: &Path) -> Command {
    let program = resolve_program(&argv[0], cwd);
    let mut cmd = Command::new(program);
    cmd.args(&argv[1..]).current_dir(cwd);
    cmd
}

pub(crate) fn resolve_program(program: &str, cwd: &Path) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative() && program.contains('/') {
        let joined = cwd.join(path);
        if joined.is_absolute() {
            joined
        } else {
            // a relative cwd would leave the child resolving the
            // program against its own post-chdir directory
            std::path::absolute(&joined).unwrap_or(joined)
        }
    } else {
        path.to_path_buf()
    }
}

/// Human-readable form of an argv for error messages.
pub(crate) fn display_argv(argv: &[String]) -> String {
    argv.join(" ")
}
