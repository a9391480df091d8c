//! The program a daemon runs.
//!
//! Without a schedule the daemon replaces itself with the program, so the
//! recorded pid is the program's pid. The pid file guard never runs after
//! `exec`; `vigil stop` removes the file once the program is gone. With a
//! schedule the daemon runs the program to completion at each interval and
//! releases the pid file itself when the loop ends. A shutdown request that
//! arrives mid-run is passed on to the running program: SIGTERM first, then
//! SIGKILL if it is still alive after a short grace period.

use std::ffi::OsString;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, ExitCode, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tracing::{info, warn};
use vigil::{Repeat, ShutdownFlag, SignalSender, SystemSignalSender};

use crate::errors::TaskError;

const TASK_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::task");

/// How often a running program is checked for exit or shutdown.
const CHILD_POLL: Duration = Duration::from_millis(25);

/// Time a program gets to honour SIGTERM before it is killed. Kept below
/// the controller's escalation pause so the daemon outlives its program.
const CHILD_GRACE: Duration = Duration::from_millis(75);

/// Interval and run count for a repeated program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Schedule {
    pub(crate) interval: Duration,
    pub(crate) times: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProgramTask {
    program: OsString,
    args: Vec<OsString>,
}

impl ProgramTask {
    /// Splits an argument vector into program and arguments.
    pub(crate) fn from_argv(argv: Vec<OsString>) -> Option<Self> {
        let mut argv = argv.into_iter();
        let program = argv.next()?;
        Some(Self {
            program,
            args: argv.collect(),
        })
    }

    /// File name of the program, used to derive a pid file location.
    pub(crate) fn name(&self) -> Option<&str> {
        Path::new(&self.program).file_name()?.to_str()
    }

    /// Runs the program as the daemon's job.
    pub(crate) fn run(&self, schedule: Option<Schedule>) -> Result<ExitCode, TaskError> {
        match schedule {
            Some(schedule) => self.repeat(schedule),
            None => Err(self.exec()),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    // Returns only when the exec call itself failed.
    fn exec(&self) -> TaskError {
        info!(
            target: TASK_TARGET,
            program = %self.program.to_string_lossy(),
            "replacing daemon image"
        );
        TaskError::Exec {
            program: self.program.clone(),
            source: self.command().exec(),
        }
    }

    fn repeat(&self, schedule: Schedule) -> Result<ExitCode, TaskError> {
        let shutdown = ShutdownFlag::install()?;
        Repeat::every(schedule.interval)
            .times(schedule.times)
            .with_shutdown(shutdown.clone())
            .run(|| self.run_once(&shutdown));
        Ok(ExitCode::SUCCESS)
    }

    fn run_once(&self, shutdown: &ShutdownFlag) {
        let outcome = self
            .command()
            .spawn()
            .and_then(|mut child| supervise(&mut child, shutdown));
        match outcome {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(
                target: TASK_TARGET,
                program = %self.program.to_string_lossy(),
                %status,
                "program exited unsuccessfully"
            ),
            Err(error) => warn!(
                target: TASK_TARGET,
                program = %self.program.to_string_lossy(),
                %error,
                "failed to run program"
            ),
        }
    }
}

/// Waits for `child`, stopping it early once `shutdown` is raised.
fn supervise(child: &mut Child, shutdown: &ShutdownFlag) -> io::Result<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if shutdown.is_raised() {
            return stop_child(child);
        }
        thread::sleep(CHILD_POLL);
    }
}

fn stop_child(child: &mut Child) -> io::Result<ExitStatus> {
    let pid = Pid::from_raw(i32::try_from(child.id()).map_err(io::Error::other)?);
    info!(target: TASK_TARGET, pid = pid.as_raw(), "stopping program for shutdown");
    SystemSignalSender
        .send(pid, Signal::SIGTERM)
        .map_err(io::Error::from)?;

    let deadline = Instant::now() + CHILD_GRACE;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        thread::sleep(CHILD_POLL.min(deadline.saturating_duration_since(Instant::now())));
    }
    warn!(target: TASK_TARGET, pid = pid.as_raw(), "program ignored SIGTERM; killing it");
    child.kill()?;
    child.wait()
}
