//! Daemon lifecycle management.
//!
//! `vigil` turns a long-running callable into a detached background process,
//! records it in a pid file, and exposes start, stop, and restart operations
//! selected by an action name.
//!
//! The pieces, leaf first:
//!
//! - [`pidfile`] reads, writes, and removes the pid marker file, and owns it
//!   for the daemon's lifetime through [`PidFileGuard`].
//! - [`process::detach`] performs the double fork, session detachment, and
//!   standard stream redirection.
//! - [`process::terminate`] sends SIGTERM, SIGHUP, and SIGKILL with short
//!   fixed pauses, treating an already exited target as success.
//! - [`lifecycle`] orchestrates the operations on top of those seams.
//! - [`dispatch`] maps action names to lifecycle operations.
//!
//! [`Daemon`] wraps all of it for programs that just want to run a function
//! as a daemon, and [`schedule`] repeats a job at a fixed interval.
//!
//! The pid file is an advisory marker and its presence alone means "running";
//! no OS liveness check is made. Two racing `start` calls can both pass the
//! absence check. A daemon killed by SIGKILL leaves a stale file behind until
//! `stop` removes it.

pub mod dispatch;
pub mod lifecycle;
pub mod pidfile;
pub mod process;
pub mod schedule;
pub mod service;
pub mod telemetry;

pub use dispatch::{Action, ActionDispatcher, DispatchError};
pub use lifecycle::{LifecycleController, LifecycleError, LifecycleState, StopMode};
pub use pidfile::{PidFileError, PidFileGuard};
pub use process::{Detacher, SignalSender, SystemDetacher, SystemSignalSender};
pub use schedule::{Repeat, ShutdownError, ShutdownFlag};
pub use service::Daemon;
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use vigil_config::{Config, StreamRedirection};

#[cfg(test)]
mod tests;
