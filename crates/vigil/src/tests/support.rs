//! Test doubles for the detachment and signalling seams.

use std::sync::{Arc, Mutex};

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::unistd::Pid;

use vigil_config::StreamRedirection;

use crate::process::{DetachError, Detacher, SignalSender};

/// Detacher that stays in-process and records each request.
#[derive(Clone, Default)]
pub(crate) struct RecordingDetacher {
    requests: Arc<Mutex<Vec<StreamRedirection>>>,
}

impl RecordingDetacher {
    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().expect("detacher mutex poisoned").len()
    }

    pub(crate) fn requests(&self) -> Vec<StreamRedirection> {
        self.requests.lock().expect("detacher mutex poisoned").clone()
    }
}

impl Detacher for RecordingDetacher {
    fn detach(&self, redirection: &StreamRedirection) -> Result<(), DetachError> {
        self.requests
            .lock()
            .expect("detacher mutex poisoned")
            .push(redirection.clone());
        Ok(())
    }
}

/// Signal sender that records deliveries and answers with a fixed result.
#[derive(Clone)]
pub(crate) struct RecordingSignalSender {
    sent: Arc<Mutex<Vec<(Pid, Signal)>>>,
    response: Arc<Mutex<Result<(), Errno>>>,
}

impl Default for RecordingSignalSender {
    fn default() -> Self {
        Self {
            sent: Arc::default(),
            response: Arc::new(Mutex::new(Ok(()))),
        }
    }
}

impl RecordingSignalSender {
    pub(crate) fn respond_with(&self, response: Result<(), Errno>) {
        *self.response.lock().expect("sender mutex poisoned") = response;
    }

    pub(crate) fn sent(&self) -> Vec<(Pid, Signal)> {
        self.sent.lock().expect("sender mutex poisoned").clone()
    }
}

impl SignalSender for RecordingSignalSender {
    fn send(&self, pid: Pid, signal: Signal) -> Result<(), Errno> {
        self.sent
            .lock()
            .expect("sender mutex poisoned")
            .push((pid, signal));
        *self.response.lock().expect("sender mutex poisoned")
    }
}
