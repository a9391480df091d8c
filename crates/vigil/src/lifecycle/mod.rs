//! Daemon lifecycle management.
//!
//! The lifecycle is a small state machine driven entirely by the pid file:
//!
//! - [`LifecycleState::NotRunning`] when no pid file exists;
//! - [`LifecycleState::Running`] once a detached daemon has recorded its pid;
//! - [`LifecycleState::Terminating`] while `stop` escalates signals.
//!
//! Submodules:
//! - `controller` implements start, stop, and restart.
//! - `error` captures the error surface.
//! - `state` defines the states and stop modes.

mod controller;
mod error;
mod state;

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

pub use controller::LifecycleController;
pub use error::LifecycleError;
pub use state::{LifecycleState, StopMode};
