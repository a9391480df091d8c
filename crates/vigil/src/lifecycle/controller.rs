//! Start, stop, and restart orchestration.
//!
//! The controller composes pid file bookkeeping, detachment, and escalating
//! termination. Each operation runs synchronously on the calling thread.
//! `start` returns only inside the detached daemon once the job has finished;
//! the original caller and the intermediate fork exit inside the detacher.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use tracing::info;

use vigil_config::StreamRedirection;

use super::{LIFECYCLE_TARGET, LifecycleError, LifecycleState, StopMode};
use crate::pidfile::{self, PidFileGuard};
use crate::process::{
    Detacher, SignalSender, SignalTerminator, SystemDetacher, SystemSignalSender,
};

/// Orchestrates the daemon lifecycle against a pid file.
#[derive(Debug, Clone)]
pub struct LifecycleController<D, S> {
    detacher: D,
    terminator: SignalTerminator<S>,
}

impl LifecycleController<SystemDetacher, SystemSignalSender> {
    /// Builds a controller that forks and signals real processes.
    #[must_use]
    pub const fn system() -> Self {
        Self::new(SystemDetacher::new(), SystemSignalSender)
    }
}

impl<D: Detacher, S: SignalSender> LifecycleController<D, S> {
    /// Builds a controller from explicit detachment and signalling seams.
    pub const fn new(detacher: D, sender: S) -> Self {
        Self {
            detacher,
            terminator: SignalTerminator::new(sender),
        }
    }

    /// Reports the state recorded by the pid file.
    ///
    /// No OS liveness check is made: a stale file still reads as running.
    pub fn state(&self, pid_file: &Path) -> Result<LifecycleState, LifecycleError> {
        Ok(LifecycleState::from_recorded(pidfile::read(pid_file)?))
    }

    /// Detaches into a daemon that records its pid and runs `job`.
    ///
    /// Fails with [`LifecycleError::AlreadyRunning`] without detaching when
    /// the pid file is present. In the detached process the pid file is
    /// removed again once `job` returns, and the job's exit code is handed
    /// back to the caller so the daemon can leave `main` normally.
    pub fn start<F>(
        &self,
        job: F,
        pid_file: &Path,
        redirection: &StreamRedirection,
    ) -> Result<ExitCode, LifecycleError>
    where
        F: FnOnce() -> ExitCode,
    {
        let pid_file = absolute_pid_file(pid_file)?;
        let redirection = absolute_redirection(redirection)?;

        if let Some(pid) = pidfile::read(&pid_file)? {
            return Err(LifecycleError::AlreadyRunning {
                path: pid_file,
                pid,
            });
        }

        self.detacher.detach(&redirection)?;
        let guard = PidFileGuard::acquire(&pid_file)?;
        log_transition(
            &pid_file,
            LifecycleState::NotRunning,
            LifecycleState::Running { pid: guard.pid() },
        );

        let status = job();

        info!(
            target: LIFECYCLE_TARGET,
            pid = guard.pid().as_raw(),
            "daemon job returned"
        );
        drop(guard);
        Ok(status)
    }

    /// Terminates the daemon recorded in `pid_file` and removes the file.
    ///
    /// With [`StopMode::Tolerant`] a missing pid file is a successful no-op;
    /// with [`StopMode::Strict`] it fails with [`LifecycleError::NotRunning`].
    pub fn stop(&self, pid_file: &Path, mode: StopMode) -> Result<(), LifecycleError> {
        let Some(pid) = pidfile::read(pid_file)? else {
            return match mode {
                StopMode::Strict => Err(LifecycleError::NotRunning {
                    path: pid_file.to_path_buf(),
                }),
                StopMode::Tolerant => {
                    info!(
                        target: LIFECYCLE_TARGET,
                        file = %pid_file.display(),
                        "nothing to stop"
                    );
                    Ok(())
                }
            };
        };

        let terminating = LifecycleState::Terminating { pid };
        log_transition(pid_file, LifecycleState::Running { pid }, terminating);
        self.terminator.terminate(pid)?;
        pidfile::remove(pid_file)?;
        log_transition(pid_file, terminating, LifecycleState::NotRunning);
        Ok(())
    }

    /// Stops any running instance, then starts a new one.
    ///
    /// The two halves are not atomic: a concurrent `start` between them can
    /// make the second half fail with [`LifecycleError::AlreadyRunning`].
    pub fn restart<F>(
        &self,
        job: F,
        pid_file: &Path,
        redirection: &StreamRedirection,
    ) -> Result<ExitCode, LifecycleError>
    where
        F: FnOnce() -> ExitCode,
    {
        self.stop(pid_file, StopMode::Tolerant)?;
        self.start(job, pid_file, redirection)
    }
}

fn log_transition(pid_file: &Path, from: LifecycleState, to: LifecycleState) {
    info!(
        target: LIFECYCLE_TARGET,
        file = %pid_file.display(),
        %from,
        %to,
        "lifecycle transition"
    );
}

// Detachment moves the working directory to `/`, so every path the daemon
// touches afterwards must already be absolute.
fn absolute_pid_file(path: &Path) -> Result<PathBuf, LifecycleError> {
    std::path::absolute(path).map_err(|source| LifecycleError::ResolvePath {
        path: path.to_path_buf(),
        source,
    })
}

fn absolute_redirection(
    redirection: &StreamRedirection,
) -> Result<StreamRedirection, LifecycleError> {
    let all_absolute = [redirection.stdin(), redirection.stdout(), redirection.stderr()]
        .iter()
        .all(|path| path.is_absolute());
    if all_absolute {
        return Ok(redirection.clone());
    }
    let current = env::current_dir().map_err(|source| LifecycleError::ResolvePath {
        path: PathBuf::from("."),
        source,
    })?;
    let base = Utf8PathBuf::from_path_buf(current).map_err(|path| LifecycleError::ResolvePath {
        path,
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "working directory is not valid UTF-8",
        ),
    })?;
    Ok(redirection.anchored_at(&base))
}
