//! Pid marker file bookkeeping.
//!
//! A readable, parseable pid file is the only signal that a daemon instance
//! claims a given path. Nothing here checks whether the recorded process is
//! actually alive; callers decide what a present pid means.
//!
//! The file holds one positive integer followed by a newline.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use nix::unistd::{Pid, getpid};
use thiserror::Error;
use tracing::{info, warn};

pub(crate) const PIDFILE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pidfile");

/// Errors raised while reading, writing, or removing a pid file.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// The pid file exists but could not be read.
    #[error("failed to read pid file '{}': {source}", .path.display())]
    Read {
        /// Pid file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The pid file content is not a positive integer.
    #[error(
        "pid file '{}' is malformed: expected a positive process id, found {content:?}",
        .path.display()
    )]
    Malformed {
        /// Pid file path.
        path: PathBuf,
        /// Content as read, trimmed of surrounding whitespace.
        content: String,
    },
    /// Creating or writing the pid file failed.
    #[error("failed to write pid file '{}': {source}", .path.display())]
    Write {
        /// Pid file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Deleting the pid file failed for a reason other than absence.
    #[error("failed to remove pid file '{}': {source}", .path.display())]
    Remove {
        /// Pid file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Reads the pid recorded at `path`.
///
/// Returns `Ok(None)` when no file exists.
pub fn read(path: &Path) -> Result<Option<Pid>, PidFileError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PidFileError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse_pid(content.trim())
        .map(Some)
        .ok_or_else(|| PidFileError::Malformed {
            path: path.to_path_buf(),
            content: content.trim().to_owned(),
        })
}

/// Creates or truncates `path` and records `pid` followed by a newline.
///
/// The file mode is left to the process umask.
pub fn write(path: &Path, pid: Pid) -> Result<(), PidFileError> {
    let write_error = |source| PidFileError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(write_error)?;
    writeln!(file, "{pid}").map_err(write_error)?;
    file.sync_all().map_err(write_error)?;
    info!(
        target: PIDFILE_TARGET,
        pid = pid.as_raw(),
        file = %path.display(),
        "pid file written"
    );
    Ok(())
}

/// Deletes the pid file.
///
/// Removing an absent file succeeds; the return value reports whether a file
/// was actually deleted.
pub fn remove(path: &Path) -> Result<bool, PidFileError> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(
                target: PIDFILE_TARGET,
                file = %path.display(),
                "pid file removed"
            );
            Ok(true)
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(PidFileError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_pid(text: &str) -> Option<Pid> {
    text.parse::<i32>()
        .ok()
        .filter(|raw| *raw > 0)
        .map(Pid::from_raw)
}

/// Ownership of a pid file by the current process.
///
/// The guard is armed before the pid is written, so the file is removed on
/// every normal exit path of the owning process, including a failed write.
/// A process killed by a signal never runs the guard and leaves the file
/// behind for the controller's `stop` to remove.
#[derive(Debug)]
pub struct PidFileGuard {
    path: PathBuf,
    pid: Pid,
}

impl PidFileGuard {
    /// Registers cleanup for `path` and records the current process id in it.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, PidFileError> {
        let guard = Self {
            path: path.into(),
            pid: getpid(),
        };
        write(&guard.path, guard.pid)?;
        Ok(guard)
    }

    /// Path of the owned pid file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pid recorded in the file.
    #[must_use]
    pub const fn pid(&self) -> Pid {
        self.pid
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        if let Err(error) = remove(&self.path) {
            warn!(
                target: PIDFILE_TARGET,
                file = %self.path.display(),
                error = %error,
                "failed to remove pid file"
            );
        }
    }
}
