//! Periodic execution of a daemon job.
//!
//! [`Repeat`] runs a job at a fixed interval, either forever or a bounded
//! number of times. A [`ShutdownFlag`] lets termination signals end the loop
//! between runs so the daemon returns through its normal exit path and its
//! pid file guard releases the file.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use signal_hook::consts::signal::{SIGHUP, SIGTERM};
use thiserror::Error;
use tracing::{debug, info};

const SCHEDULE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::schedule");

/// Longest uninterrupted sleep between shutdown checks.
const PAUSE_SLICE: Duration = Duration::from_millis(50);

/// Errors reported while installing shutdown handlers.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shared flag raised when the daemon should leave its loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    /// Builds a lowered flag that only [`ShutdownFlag::trigger`] raises.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a flag raised by SIGTERM or SIGHUP.
    ///
    /// Once installed, those signals no longer terminate the process
    /// directly; SIGKILL still does.
    pub fn install() -> Result<Self, ShutdownError> {
        let flag = Self::new();
        for signal in [SIGTERM, SIGHUP] {
            signal_hook::flag::register(signal, Arc::clone(&flag.0))
                .map_err(|source| ShutdownError::Install { source })?;
        }
        debug!(target: SCHEDULE_TARGET, "shutdown handlers installed");
        Ok(flag)
    }

    /// Raises the flag.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs a job at a fixed interval.
#[derive(Debug, Clone)]
pub struct Repeat {
    interval: Duration,
    times: u32,
    shutdown: ShutdownFlag,
}

impl Repeat {
    /// Runs forever, pausing `interval` after each run.
    #[must_use]
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            times: 0,
            shutdown: ShutdownFlag::new(),
        }
    }

    /// Limits the loop to `times` runs. Zero means unbounded.
    #[must_use]
    pub const fn times(mut self, times: u32) -> Self {
        self.times = times;
        self
    }

    /// Ends the loop early once `flag` is raised.
    #[must_use]
    pub fn with_shutdown(mut self, flag: ShutdownFlag) -> Self {
        self.shutdown = flag;
        self
    }

    /// Runs `job` until the count is reached or shutdown is requested.
    ///
    /// Returns the number of completed runs. No pause follows the final run
    /// of a bounded loop.
    pub fn run<F: FnMut()>(&self, mut job: F) -> u32 {
        let mut runs: u32 = 0;
        while !self.shutdown.is_raised() {
            job();
            runs = runs.saturating_add(1);
            if self.times != 0 && runs >= self.times {
                break;
            }
            if !self.pause() {
                break;
            }
        }
        info!(
            target: SCHEDULE_TARGET,
            runs,
            shutdown = self.shutdown.is_raised(),
            "repeat loop finished"
        );
        runs
    }

    // Sleeps in slices; returns false when shutdown interrupts the pause.
    fn pause(&self) -> bool {
        let deadline = Instant::now() + self.interval;
        loop {
            if self.shutdown.is_raised() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            thread::sleep(remaining.min(PAUSE_SLICE));
        }
    }
}
