//! Shared configuration for the `vigil` daemon tooling.
//!
//! The configuration is layered: built-in defaults are overridden by
//! `VIGIL_*` environment variables, which in turn are overridden by command
//! line flags. [`Config`] is a [`clap::Args`] struct so binaries can flatten it
//! into their own parsers while library users build it directly.

mod defaults;
mod logging;
mod redirection;
mod runtime;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;

pub use defaults::{
    DEFAULT_LOG_FILTER, NULL_DEVICE, PID_FILE_EXTENSION, RUNTIME_NAMESPACE, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use redirection::StreamRedirection;
pub use runtime::{PidLocationError, default_pid_file, runtime_directory};

/// Daemon configuration shared by the CLI and library entry points.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct Config {
    /// Pid file recording the running daemon instance.
    #[arg(long, env = "VIGIL_PID_FILE", value_name = "PATH")]
    pub pid_file: Option<Utf8PathBuf>,
    /// Daemon name used to derive the pid file when none is given.
    #[arg(long, env = "VIGIL_NAME", value_name = "NAME")]
    pub name: Option<String>,
    /// Input source for the daemon (opened read-only).
    #[arg(long, env = "VIGIL_STDIN", value_name = "PATH", default_value = NULL_DEVICE)]
    pub stdin: Utf8PathBuf,
    /// Output target for the daemon (opened for appending).
    #[arg(long, env = "VIGIL_STDOUT", value_name = "PATH", default_value = NULL_DEVICE)]
    pub stdout: Utf8PathBuf,
    /// Error target for the daemon (opened for appending).
    #[arg(long, env = "VIGIL_STDERR", value_name = "PATH", default_value = NULL_DEVICE)]
    pub stderr: Utf8PathBuf,
    /// Log filter expression in `tracing` env-filter syntax.
    #[arg(long, env = "VIGIL_LOG_FILTER", value_name = "FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
    /// Log output format.
    #[arg(long, env = "VIGIL_LOG_FORMAT", value_name = "FORMAT", default_value_t = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pid_file: None,
            name: None,
            stdin: Utf8PathBuf::from(NULL_DEVICE),
            stdout: Utf8PathBuf::from(NULL_DEVICE),
            stderr: Utf8PathBuf::from(NULL_DEVICE),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Collects the three stream targets.
    #[must_use]
    pub fn redirection(&self) -> StreamRedirection {
        StreamRedirection::new(
            self.stdin.clone(),
            self.stdout.clone(),
            self.stderr.clone(),
        )
    }

    /// Resolves the pid file location.
    ///
    /// An explicit pid file wins. Otherwise the configured name, or failing
    /// that `fallback_name`, selects a file in the runtime directory.
    pub fn resolve_pid_file(
        &self,
        fallback_name: Option<&str>,
    ) -> Result<Utf8PathBuf, PidLocationError> {
        if let Some(path) = &self.pid_file {
            return Ok(path.clone());
        }
        let name = self
            .name
            .as_deref()
            .or(fallback_name)
            .ok_or(PidLocationError::Unnamed)?;
        default_pid_file(name)
    }

    /// Returns the explicit pid file, if one was configured.
    #[must_use]
    pub fn pid_file(&self) -> Option<&Utf8Path> {
        self.pid_file.as_deref()
    }
}
