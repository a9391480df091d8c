//! Command line front end for `vigil`.
//!
//! `vigil [CONFIG FLAGS] [--every SECS [--times N]] <ACTION> [-- PROGRAM [ARGS...]]`
//!
//! `start` and `restart` detach and run `PROGRAM` as the daemon; `stop`
//! terminates the daemon recorded in the pid file. The pid file defaults to
//! a file named after the program in the per-user runtime directory.

mod cli;
mod errors;
mod task;

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use tracing::error;
use vigil::{Action, ActionDispatcher, telemetry};

use crate::cli::Cli;
use crate::errors::AppError;
use crate::task::{ProgramTask, Schedule};

const CLI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::run");

/// Runs the CLI using the provided arguments and IO handles.
///
/// Inside the detached daemon this returns once the program has finished,
/// or never when the daemon image was replaced by the program.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(usage) => return report_usage(&usage, stdout, stderr),
    };
    match execute(cli) {
        Ok(status) => status,
        Err(failure) => {
            writeln!(stderr, "{failure}").ok();
            ExitCode::FAILURE
        }
    }
}

fn report_usage<W, E>(usage: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    W: Write,
    E: Write,
{
    let rendered = usage.render();
    match usage.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            write!(stdout, "{rendered}").ok();
            ExitCode::SUCCESS
        }
        _ => {
            write!(stderr, "{rendered}").ok();
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<ExitCode, AppError> {
    telemetry::initialise(&cli.config)?;
    let action = Action::from_name(&cli.action)?;
    let task = ProgramTask::from_argv(cli.program);
    if action.requires_job() && task.is_none() {
        return Err(AppError::MissingProgram { action });
    }

    let pid_file = cli
        .config
        .resolve_pid_file(task.as_ref().and_then(ProgramTask::name))?;
    let redirection = cli.config.redirection();
    let schedule = cli.every.map(|seconds| Schedule {
        interval: Duration::from_secs(seconds),
        times: cli.times,
    });

    let status = ActionDispatcher::system().execute(
        action,
        move || run_task(task.as_ref(), schedule),
        pid_file.as_std_path(),
        &redirection,
    )?;
    Ok(status)
}

fn run_task(task: Option<&ProgramTask>, schedule: Option<Schedule>) -> ExitCode {
    let Some(task) = task else {
        return ExitCode::SUCCESS;
    };
    match task.run(schedule) {
        Ok(status) => status,
        Err(failure) => {
            error!(target: CLI_TARGET, error = %failure, "daemon program failed");
            writeln!(io::stderr(), "{failure}").ok();
            ExitCode::FAILURE
        }
    }
}
