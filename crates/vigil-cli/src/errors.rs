//! Error types for the CLI runtime.

use std::ffi::OsString;
use std::io;

use thiserror::Error;
use vigil::{Action, DispatchError, ShutdownError, TelemetryError};
use vigil_config::PidLocationError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("action '{action}' requires a program after '--'")]
    MissingProgram { action: Action },
    #[error(transparent)]
    PidLocation(#[from] PidLocationError),
}

/// Failures of the program run inside the daemon.
#[derive(Debug, Error)]
pub(crate) enum TaskError {
    #[error("failed to execute '{}': {source}", .program.to_string_lossy())]
    Exec {
        program: OsString,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}
