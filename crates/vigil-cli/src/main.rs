//! CLI entrypoint for `vigil`.
//!
//! The binary delegates to [`vigil_cli::run`]. Standard streams are passed
//! unlocked: detachment forks and redirects them while `run` is executing.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    vigil_cli::run(std::env::args_os(), &mut io::stdout(), &mut io::stderr())
}
