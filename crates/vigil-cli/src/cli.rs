//! CLI argument definitions for `vigil`.

use std::ffi::OsString;

use clap::Parser;
use vigil_config::Config;

/// Runs a program as a daemon tracked by a pid file.
#[derive(Parser, Debug)]
#[command(
    name = "vigil",
    version,
    about = "Run a program as a daemon and control it with start, stop, and restart."
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) config: Config,
    /// Runs the program every SECS seconds instead of replacing the daemon with it.
    #[arg(long, value_name = "SECS")]
    pub(crate) every: Option<u64>,
    /// Number of runs when repeating; 0 repeats until the daemon is stopped.
    #[arg(long, value_name = "N", default_value_t = 0, requires = "every")]
    pub(crate) times: u32,
    /// Lifecycle action: start, stop, or restart.
    #[arg(value_name = "ACTION")]
    pub(crate) action: String,
    /// Program and arguments for start and restart, after `--`.
    #[arg(value_name = "PROGRAM", last = true)]
    pub(crate) program: Vec<OsString>,
}
