//! Derives the default location of pid files.
//!
//! When the operator does not name a pid file explicitly, the file lives in a
//! per-user runtime directory so that separate invocations of the controller
//! agree on where a named daemon records its pid.

use std::env;
use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use nix::unistd::geteuid;

use crate::defaults::{PID_FILE_EXTENSION, RUNTIME_NAMESPACE};

/// Errors raised while deriving a pid file location.
#[derive(Debug, Error)]
pub enum PidLocationError {
    /// Neither an explicit pid file nor a daemon name was available.
    #[error("no pid file configured; pass --pid-file or --name")]
    Unnamed,
    /// The daemon name cannot be used as a file name.
    #[error("daemon name '{name}' is not a valid file name")]
    InvalidName {
        /// Rejected daemon name.
        name: String,
    },
    /// The runtime directory path was not valid UTF-8.
    #[error("runtime directory '{path:?}' is not valid UTF-8")]
    NonUtf8Directory {
        /// Offending directory.
        path: PathBuf,
    },
    /// Creating the runtime directory failed.
    #[error("failed to prepare runtime directory '{path}': {source}")]
    RuntimeDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Returns the directory that holds derived pid files, creating it if needed.
pub fn runtime_directory() -> Result<Utf8PathBuf, PidLocationError> {
    let directory = Utf8PathBuf::from_path_buf(default_runtime_directory())
        .map_err(|path| PidLocationError::NonUtf8Directory { path })?;
    prepare_directory(&directory)?;
    Ok(directory)
}

/// Derives `<runtime dir>/vigil/<name>.pid` for a named daemon.
pub fn default_pid_file(name: &str) -> Result<Utf8PathBuf, PidLocationError> {
    validate_name(name)?;
    Ok(pid_file_in(&runtime_directory()?, name))
}

fn validate_name(name: &str) -> Result<(), PidLocationError> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(PidLocationError::InvalidName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

fn prepare_directory(directory: &Utf8Path) -> Result<(), PidLocationError> {
    fs::create_dir_all(directory).map_err(|source| PidLocationError::RuntimeDirectory {
        path: directory.to_owned(),
        source,
    })
}

fn pid_file_in(directory: &Utf8Path, name: &str) -> Utf8PathBuf {
    directory.join(format!("{name}.{PID_FILE_EXTENSION}"))
}

fn default_runtime_directory() -> PathBuf {
    #[cfg(unix)]
    {
        if let Some(mut dir) = runtime_dir() {
            dir.push(RUNTIME_NAMESPACE);
            return dir;
        }
        let mut dir = env::temp_dir();
        dir.push(RUNTIME_NAMESPACE);
        dir.push(format!("uid-{}", geteuid()));
        dir
    }

    #[cfg(not(unix))]
    {
        let mut dir = env::temp_dir();
        dir.push(RUNTIME_NAMESPACE);
        dir
    }
}
