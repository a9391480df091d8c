//! Entry point for turning a function into a daemon driven by an action name.
//!
//! ```no_run
//! use std::process::ExitCode;
//! use std::time::Duration;
//!
//! use vigil::Daemon;
//!
//! fn main() -> ExitCode {
//!     let action = std::env::args().nth(1).unwrap_or_default();
//!     Daemon::new("/tmp/ticker.pid")
//!         .stdout("/tmp/ticker.log")
//!         .run_repeating(&action, Duration::from_secs(5), 0, || println!("tick"))
//! }
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use tracing::error;

use vigil_config::StreamRedirection;

use crate::dispatch::{ActionDispatcher, DispatchError};
use crate::process::{Detacher, SignalSender};
use crate::schedule::{Repeat, ShutdownFlag};

const SERVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service");

/// A daemon identified by its pid file, with stream redirection targets.
#[derive(Debug, Clone)]
pub struct Daemon {
    pid_file: PathBuf,
    redirection: StreamRedirection,
}

impl Daemon {
    /// Describes a daemon recorded in `pid_file` with all streams on the
    /// null device.
    #[must_use]
    pub fn new(pid_file: impl Into<PathBuf>) -> Self {
        Self {
            pid_file: pid_file.into(),
            redirection: StreamRedirection::default(),
        }
    }

    /// Sets the input source.
    #[must_use]
    pub fn stdin(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.redirection = self.redirection.with_stdin(path);
        self
    }

    /// Sets the output target.
    #[must_use]
    pub fn stdout(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.redirection = self.redirection.with_stdout(path);
        self
    }

    /// Sets the error target.
    #[must_use]
    pub fn stderr(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.redirection = self.redirection.with_stderr(path);
        self
    }

    /// Replaces all three stream targets.
    #[must_use]
    pub fn redirection(mut self, redirection: StreamRedirection) -> Self {
        self.redirection = redirection;
        self
    }

    /// Dispatches `action` for `job`.
    ///
    /// Errors are written to the error stream and reported as
    /// `ExitCode::FAILURE`.
    pub fn run<F>(&self, action: &str, job: F) -> ExitCode
    where
        F: FnOnce() -> ExitCode,
    {
        self.run_with(&ActionDispatcher::system(), action, job, &mut io::stderr())
    }

    /// Dispatches `action` for a job repeated every `interval`.
    ///
    /// `times == 0` repeats until SIGTERM or SIGHUP arrives.
    pub fn run_repeating<F>(&self, action: &str, interval: Duration, times: u32, job: F) -> ExitCode
    where
        F: FnMut(),
    {
        self.run(action, move || repeat_until_shutdown(interval, times, job))
    }

    /// Dispatches through an explicit dispatcher and error sink.
    pub fn run_with<D, S, F, W>(
        &self,
        dispatcher: &ActionDispatcher<D, S>,
        action: &str,
        job: F,
        errors: &mut W,
    ) -> ExitCode
    where
        D: Detacher,
        S: SignalSender,
        F: FnOnce() -> ExitCode,
        W: Write,
    {
        match dispatcher.dispatch(action, job, &self.pid_file, &self.redirection) {
            Ok(status) => status,
            Err(failure) => report(&failure, errors),
        }
    }
}

fn repeat_until_shutdown<F: FnMut()>(interval: Duration, times: u32, job: F) -> ExitCode {
    let shutdown = match ShutdownFlag::install() {
        Ok(flag) => flag,
        Err(failure) => {
            error!(target: SERVICE_TARGET, error = %failure, "repeat loop not started");
            return ExitCode::FAILURE;
        }
    };
    Repeat::every(interval)
        .times(times)
        .with_shutdown(shutdown)
        .run(job);
    ExitCode::SUCCESS
}

fn report<W: Write>(failure: &DispatchError, errors: &mut W) -> ExitCode {
    error!(target: SERVICE_TARGET, error = %failure, "lifecycle action failed");
    // The error stream may already be gone; the exit status still reports
    // the failure.
    writeln!(errors, "{failure}").ok();
    ExitCode::FAILURE
}
