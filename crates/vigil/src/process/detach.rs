//! Double-fork detachment of the calling process.
//!
//! The sequence mirrors the classic Unix recipe:
//!
//! 0. SIGHUP is ignored so a terminal that closes mid-sequence cannot kill
//!    the child before it leaves the session;
//! 1. fork; the original process exits 0 and hands off responsibility;
//! 2. the child becomes a session leader, moves to `/`, and clears its umask;
//! 3. fork again; the intermediate process exits 0 so the survivor can never
//!    reacquire a controlling terminal, and restores the default SIGHUP
//!    disposition so escalating termination still reaches it;
//! 4. the survivor flushes its inherited standard streams and rebinds file
//!    descriptors 0, 1, and 2 to the configured redirection targets.
//!
//! Every step is fatal on failure. Detachment must run while the process is
//! still single-threaded: `fork` only duplicates the calling thread, and locks
//! held by any other thread would stay locked forever in the child.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::process;

use camino::Utf8Path;
use nix::errno::Errno;
use nix::libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::sys::stat::{Mode, umask};
use nix::unistd::{ForkResult, chdir, dup2, fork, getpid, setsid};
use strum::Display;
use thiserror::Error;
use tracing::{debug, info};

use vigil_config::StreamRedirection;

use super::PROCESS_TARGET;

/// Abstraction over detachment strategies.
pub trait Detacher {
    /// Detaches the calling process into the background.
    ///
    /// Returns only in the final, fully detached process. Intermediate
    /// processes exit with status 0 inside this call.
    fn detach(&self, redirection: &StreamRedirection) -> Result<(), DetachError>;
}

/// Which of the two forks failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ForkStage {
    /// The fork that releases the original caller.
    #[strum(serialize = "fork #1")]
    First,
    /// The fork that drops session leadership.
    #[strum(serialize = "fork #2")]
    Second,
}

/// One of the three standard stream slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum StandardStream {
    /// File descriptor 0.
    Stdin,
    /// File descriptor 1.
    Stdout,
    /// File descriptor 2.
    Stderr,
}

impl StandardStream {
    const fn descriptor(self) -> RawFd {
        match self {
            Self::Stdin => STDIN_FILENO,
            Self::Stdout => STDOUT_FILENO,
            Self::Stderr => STDERR_FILENO,
        }
    }
}

/// Errors surfaced while detaching the process.
#[derive(Debug, Error)]
pub enum DetachError {
    /// The OS refused to duplicate the process.
    #[error("{stage} failed: {source}")]
    Fork {
        /// Fork that failed.
        stage: ForkStage,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Creating a new session failed.
    #[error("failed to create a new session: {source}")]
    Session {
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Moving to the filesystem root failed.
    #[error("failed to change directory to '/': {source}")]
    WorkingDirectory {
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// A redirection target could not be opened.
    #[error("failed to open {stream} target '{}': {source}", .path.display())]
    OpenStream {
        /// Stream being redirected.
        stream: StandardStream,
        /// Target path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Changing the SIGHUP disposition failed.
    #[error("failed to change the SIGHUP disposition: {source}")]
    HangupDisposition {
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Rebinding the stream's file descriptor failed.
    #[error("failed to redirect {stream}: {source}")]
    RedirectStream {
        /// Stream being redirected.
        stream: StandardStream,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}

/// Detacher that performs the real double fork.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDetacher;

impl SystemDetacher {
    /// Builds a new system detacher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Detacher for SystemDetacher {
    fn detach(&self, redirection: &StreamRedirection) -> Result<(), DetachError> {
        let shield = HangupShield::raise()?;
        fork_and_release_parent(ForkStage::First)?;

        setsid().map_err(|source| DetachError::Session { source })?;
        chdir("/").map_err(|source| DetachError::WorkingDirectory { source })?;
        umask(Mode::empty());
        debug!(
            target: PROCESS_TARGET,
            pid = getpid().as_raw(),
            "detached from session; working directory and umask reset"
        );

        fork_and_release_parent(ForkStage::Second)?;
        shield.lower_to_default()?;

        redirect_standard_streams(redirection)?;
        info!(
            target: PROCESS_TARGET,
            pid = getpid().as_raw(),
            "daemon process detached"
        );
        Ok(())
    }
}

/// Keeps SIGHUP ignored while the process may still belong to the caller's
/// terminal session.
///
/// Dropping the shield restores the caller's previous disposition, which
/// covers every failure path. The detached process instead switches to the
/// default disposition so an inherited "ignore" cannot survive into the
/// daemon or a program it execs.
struct HangupShield {
    previous: Option<SigAction>,
}

impl HangupShield {
    fn raise() -> Result<Self, DetachError> {
        let previous = set_hangup_action(SigHandler::SigIgn)?;
        Ok(Self {
            previous: Some(previous),
        })
    }

    fn lower_to_default(mut self) -> Result<(), DetachError> {
        self.previous = None;
        set_hangup_action(SigHandler::SigDfl).map(drop)
    }
}

impl Drop for HangupShield {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            // SAFETY: reinstates a disposition previously returned by the OS.
            unsafe { sigaction(Signal::SIGHUP, &previous) }.ok();
        }
    }
}

fn set_hangup_action(handler: SigHandler) -> Result<SigAction, DetachError> {
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::empty());
    // SAFETY: SIG_IGN and SIG_DFL install no handler code.
    unsafe { sigaction(Signal::SIGHUP, &action) }
        .map_err(|source| DetachError::HangupDisposition { source })
}

fn fork_and_release_parent(stage: ForkStage) -> Result<(), DetachError> {
    flush_standard_streams();
    // SAFETY: detachment runs before the caller starts any threads, so the
    // child inherits a consistent single-threaded address space.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            debug!(
                target: PROCESS_TARGET,
                %stage,
                child = child.as_raw(),
                "handing off to child"
            );
            process::exit(0);
        }
        Ok(ForkResult::Child) => Ok(()),
        Err(source) => Err(DetachError::Fork { stage, source }),
    }
}

fn flush_standard_streams() {
    // Unflushed buffers would otherwise be written twice, once per process.
    io::stdout().flush().ok();
    io::stderr().flush().ok();
}

fn redirect_standard_streams(redirection: &StreamRedirection) -> Result<(), DetachError> {
    flush_standard_streams();
    let mut read_only = OpenOptions::new();
    read_only.read(true);
    let mut append = OpenOptions::new();
    append.create(true).append(true);

    let input = open_target(StandardStream::Stdin, redirection.stdin(), &read_only)?;
    let output = open_target(StandardStream::Stdout, redirection.stdout(), &append)?;
    let error = open_target(StandardStream::Stderr, redirection.stderr(), &append)?;

    bind(StandardStream::Stdin, &input)?;
    bind(StandardStream::Stdout, &output)?;
    bind(StandardStream::Stderr, &error)?;
    Ok(())
}

fn open_target(
    stream: StandardStream,
    path: &Utf8Path,
    options: &OpenOptions,
) -> Result<File, DetachError> {
    options
        .open(path)
        .map_err(|source| DetachError::OpenStream {
            stream,
            path: path.as_std_path().to_path_buf(),
            source,
        })
}

fn bind(stream: StandardStream, file: &File) -> Result<(), DetachError> {
    dup2(file.as_raw_fd(), stream.descriptor())
        .map(drop)
        .map_err(|source| DetachError::RedirectStream { stream, source })
}
