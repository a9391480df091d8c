//! Error types for daemon lifecycle operations.

use std::io;
use std::path::PathBuf;

use nix::unistd::Pid;
use thiserror::Error;

use crate::pidfile::PidFileError;
use crate::process::{DetachError, TerminateError};

/// Errors raised while executing lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A pid file already claims the path.
    #[error(
        "daemon already running with pid {pid} (pid file '{}'); \
         run stop to terminate it, or to clear the file if that process has already exited",
        .path.display()
    )]
    AlreadyRunning {
        /// Pid file path.
        path: PathBuf,
        /// Pid recorded in the file.
        pid: Pid,
    },
    /// No pid file exists at stop time.
    #[error("daemon is not running (pid file '{}' not found)", .path.display())]
    NotRunning {
        /// Pid file path.
        path: PathBuf,
    },
    /// A relative path could not be anchored before detaching.
    #[error("failed to resolve '{}' to an absolute path: {source}", .path.display())]
    ResolvePath {
        /// Path being resolved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Pid file bookkeeping failed.
    #[error(transparent)]
    PidFile(#[from] PidFileError),
    /// Detaching the daemon failed.
    #[error(transparent)]
    Detach(#[from] DetachError),
    /// Terminating the daemon failed.
    #[error(transparent)]
    Terminate(#[from] TerminateError),
}
