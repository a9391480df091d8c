//! Lifecycle states and stop modes.

use std::fmt;

use nix::unistd::Pid;

/// Observable state of a daemon tracked by a pid file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No pid file claims the path.
    NotRunning,
    /// A pid file records `pid`.
    Running {
        /// Recorded process id.
        pid: Pid,
    },
    /// A stop sequence is in progress against `pid`.
    Terminating {
        /// Process being terminated.
        pid: Pid,
    },
}

impl LifecycleState {
    /// Maps the content of a pid file to a state.
    #[must_use]
    pub const fn from_recorded(pid: Option<Pid>) -> Self {
        match pid {
            Some(pid) => Self::Running { pid },
            None => Self::NotRunning,
        }
    }

    /// Returns the pid associated with the state, if any.
    #[must_use]
    pub const fn pid(self) -> Option<Pid> {
        match self {
            Self::NotRunning => None,
            Self::Running { pid } | Self::Terminating { pid } => Some(pid),
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRunning => formatter.write_str("not running"),
            Self::Running { pid } => write!(formatter, "running (pid {pid})"),
            Self::Terminating { pid } => write!(formatter, "terminating (pid {pid})"),
        }
    }
}

/// How `stop` treats a missing pid file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMode {
    /// A missing pid file is an error.
    #[default]
    Strict,
    /// A missing pid file is a successful no-op. Used by restart.
    Tolerant,
}
