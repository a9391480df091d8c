//! Maps action names onto lifecycle operations.
//!
//! The set of actions is closed. Names are matched exactly against the
//! lowercase spellings and anything else is rejected before any process
//! manipulation happens.

use std::path::Path;
use std::process::ExitCode;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;
use tracing::debug;

use vigil_config::StreamRedirection;

use crate::lifecycle::{LifecycleController, LifecycleError, StopMode};
use crate::process::{Detacher, SignalSender, SystemDetacher, SystemSignalSender};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Lifecycle operations selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    /// Detach and run the job.
    Start,
    /// Terminate the recorded daemon.
    Stop,
    /// Stop any running instance, then start.
    Restart,
}

impl Action {
    /// Looks up an action by name.
    pub fn from_name(name: &str) -> Result<Self, DispatchError> {
        name.parse().map_err(|_| DispatchError::UnknownAction {
            action: name.to_owned(),
            valid: Self::valid_names(),
        })
    }

    /// Every valid action name in sorted order.
    #[must_use]
    pub fn valid_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Self::iter().map(Into::into).collect();
        names.sort_unstable();
        names
    }

    /// Whether the action runs a job in a detached process.
    #[must_use]
    pub const fn requires_job(self) -> bool {
        matches!(self, Self::Start | Self::Restart)
    }
}

/// Errors raised while dispatching an action.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The action name is not recognised.
    #[error("unknown action '{action}'; expected one of: {}", .valid.join(", "))]
    UnknownAction {
        /// Name that was supplied.
        action: String,
        /// Valid names, sorted.
        valid: Vec<&'static str>,
    },
    /// The selected lifecycle operation failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Routes actions to a [`LifecycleController`].
#[derive(Debug, Clone)]
pub struct ActionDispatcher<D, S> {
    controller: LifecycleController<D, S>,
}

impl ActionDispatcher<SystemDetacher, SystemSignalSender> {
    /// Builds a dispatcher over the system controller.
    #[must_use]
    pub const fn system() -> Self {
        Self::new(LifecycleController::system())
    }
}

impl<D: Detacher, S: SignalSender> ActionDispatcher<D, S> {
    /// Wraps `controller`.
    pub const fn new(controller: LifecycleController<D, S>) -> Self {
        Self { controller }
    }

    /// The controller actions are routed to.
    pub const fn controller(&self) -> &LifecycleController<D, S> {
        &self.controller
    }

    /// Resolves `name` and runs the matching operation.
    pub fn dispatch<F>(
        &self,
        name: &str,
        job: F,
        pid_file: &Path,
        redirection: &StreamRedirection,
    ) -> Result<ExitCode, DispatchError>
    where
        F: FnOnce() -> ExitCode,
    {
        let action = Action::from_name(name)?;
        self.execute(action, job, pid_file, redirection)
    }

    /// Runs an already resolved action.
    ///
    /// `stop` ignores `job` and fails when nothing is running.
    pub fn execute<F>(
        &self,
        action: Action,
        job: F,
        pid_file: &Path,
        redirection: &StreamRedirection,
    ) -> Result<ExitCode, DispatchError>
    where
        F: FnOnce() -> ExitCode,
    {
        debug!(
            target: DISPATCH_TARGET,
            %action,
            file = %pid_file.display(),
            "dispatching action"
        );
        let status = match action {
            Action::Start => self.controller.start(job, pid_file, redirection)?,
            Action::Stop => {
                self.controller.stop(pid_file, StopMode::Strict)?;
                ExitCode::SUCCESS
            }
            Action::Restart => self.controller.restart(job, pid_file, redirection)?,
        };
        Ok(status)
    }
}
