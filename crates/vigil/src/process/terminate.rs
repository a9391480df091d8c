//! Escalating termination of a daemon process.
//!
//! The target receives SIGTERM, then SIGHUP, then SIGKILL with a short fixed
//! pause after each of the first two. The sequence always runs to completion:
//! no liveness check happens between steps, so a slow but alive process is
//! killed within a bounded time. A delivery failure reporting `ESRCH` means
//! the target is already gone and counts as success.
//!
//! Only the recorded pid is signalled, never its process group. A repeating
//! daemon forwards shutdown to the program it is running; a program that
//! forks its own children is responsible for them.

use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use thiserror::Error;
use tracing::{debug, info};

use super::PROCESS_TARGET;

/// Pause between escalation steps.
pub const ESCALATION_PAUSE: Duration = Duration::from_millis(100);

/// Ordered signals and the pause that follows each one.
pub const TERMINATION_SEQUENCE: [(Signal, Duration); 3] = [
    (Signal::SIGTERM, ESCALATION_PAUSE),
    (Signal::SIGHUP, ESCALATION_PAUSE),
    (Signal::SIGKILL, Duration::ZERO),
];

/// Delivers a signal to a process.
pub trait SignalSender {
    /// Sends `signal` to `pid`.
    fn send(&self, pid: Pid, signal: Signal) -> Result<(), Errno>;
}

/// Signal sender backed by `kill(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSignalSender;

impl SignalSender for SystemSignalSender {
    fn send(&self, pid: Pid, signal: Signal) -> Result<(), Errno> {
        kill(pid, signal)
    }
}

/// Outcome of a single escalation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The signal reached the target.
    Delivered,
    /// The target no longer existed.
    AlreadyGone,
}

/// Record of one signal sent during termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalOutcome {
    /// Signal that was sent.
    pub signal: Signal,
    /// What happened to it.
    pub delivery: Delivery,
}

/// Errors raised while terminating a process.
#[derive(Debug, Error)]
pub enum TerminateError {
    /// A signal could not be delivered for a reason other than absence.
    #[error("failed to send {signal} to pid {pid}: {source}")]
    SignalDelivery {
        /// Target process.
        pid: Pid,
        /// Signal that failed.
        signal: Signal,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}

/// Runs [`TERMINATION_SEQUENCE`] against a target pid.
#[derive(Debug, Clone)]
pub struct SignalTerminator<S> {
    sender: S,
}

impl<S: SignalSender> SignalTerminator<S> {
    /// Builds a terminator that delivers signals through `sender`.
    pub const fn new(sender: S) -> Self {
        Self { sender }
    }

    /// Sends every signal in the sequence to `pid`, pausing between steps.
    pub fn terminate(&self, pid: Pid) -> Result<Vec<SignalOutcome>, TerminateError> {
        let mut outcomes = Vec::with_capacity(TERMINATION_SEQUENCE.len());
        for (signal, pause) in TERMINATION_SEQUENCE {
            let delivery = self.deliver(pid, signal)?;
            outcomes.push(SignalOutcome { signal, delivery });
            if !pause.is_zero() {
                thread::sleep(pause);
            }
        }
        info!(
            target: PROCESS_TARGET,
            pid = pid.as_raw(),
            "termination sequence completed"
        );
        Ok(outcomes)
    }

    fn deliver(&self, pid: Pid, signal: Signal) -> Result<Delivery, TerminateError> {
        match self.sender.send(pid, signal) {
            Ok(()) => {
                info!(
                    target: PROCESS_TARGET,
                    pid = pid.as_raw(),
                    %signal,
                    "signal delivered"
                );
                Ok(Delivery::Delivered)
            }
            Err(Errno::ESRCH) => {
                debug!(
                    target: PROCESS_TARGET,
                    pid = pid.as_raw(),
                    %signal,
                    "target already gone"
                );
                Ok(Delivery::AlreadyGone)
            }
            Err(source) => Err(TerminateError::SignalDelivery {
                pid,
                signal,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::process::Command;
    use std::sync::{Arc, Mutex};

    use mockall::{Sequence, mock};
    use mockall::predicate::eq;

    use super::*;

    mock! {
        Sender {}
        impl SignalSender for Sender {
            fn send(&self, pid: Pid, signal: Signal) -> Result<(), Errno>;
        }
    }

    const TARGET: Pid = Pid::from_raw(4242);

    fn expect_in_order(sender: &mut MockSender, results: [Result<(), Errno>; 3]) {
        let mut sequence = Sequence::new();
        for ((signal, _), result) in TERMINATION_SEQUENCE.into_iter().zip(results) {
            sender
                .expect_send()
                .with(eq(TARGET), eq(signal))
                .times(1)
                .in_sequence(&mut sequence)
                .return_const(result);
        }
    }

    #[test]
    fn escalates_through_every_signal_in_order() {
        let mut sender = MockSender::new();
        expect_in_order(&mut sender, [Ok(()), Ok(()), Ok(())]);
        let outcomes = SignalTerminator::new(sender)
            .terminate(TARGET)
            .expect("termination should succeed");
        let signals: Vec<Signal> = outcomes.iter().map(|outcome| outcome.signal).collect();
        assert_eq!(
            signals,
            vec![Signal::SIGTERM, Signal::SIGHUP, Signal::SIGKILL]
        );
        assert!(
            outcomes
                .iter()
                .all(|outcome| outcome.delivery == Delivery::Delivered)
        );
    }

    #[test]
    fn keeps_escalating_after_the_target_is_gone() {
        let mut sender = MockSender::new();
        expect_in_order(
            &mut sender,
            [Ok(()), Err(Errno::ESRCH), Err(Errno::ESRCH)],
        );
        let outcomes = SignalTerminator::new(sender)
            .terminate(TARGET)
            .expect("absence counts as success");
        let deliveries: Vec<Delivery> = outcomes.iter().map(|outcome| outcome.delivery).collect();
        assert_eq!(
            deliveries,
            vec![
                Delivery::Delivered,
                Delivery::AlreadyGone,
                Delivery::AlreadyGone
            ]
        );
    }

    #[test]
    fn other_delivery_errors_stop_the_sequence() {
        let mut sender = MockSender::new();
        sender
            .expect_send()
            .with(eq(TARGET), eq(Signal::SIGTERM))
            .times(1)
            .return_const(Err(Errno::EPERM));
        let error = SignalTerminator::new(sender)
            .terminate(TARGET)
            .expect_err("EPERM should be fatal");
        let TerminateError::SignalDelivery {
            pid,
            signal,
            source,
        } = error;
        assert_eq!(pid, TARGET);
        assert_eq!(signal, Signal::SIGTERM);
        assert_eq!(source, Errno::EPERM);
    }

    #[test]
    fn waits_between_escalation_steps() {
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&stamps);
        let mut sender = MockSender::new();
        sender.expect_send().times(3).returning(move |_, _| {
            recorded
                .lock()
                .expect("stamp mutex poisoned")
                .push(std::time::Instant::now());
            Ok(())
        });
        SignalTerminator::new(sender)
            .terminate(TARGET)
            .expect("termination should succeed");
        let stamps = stamps.lock().expect("stamp mutex poisoned");
        for pair in stamps.windows(2) {
            if let [earlier, later] = pair {
                assert!(later.duration_since(*earlier) >= ESCALATION_PAUSE);
            }
        }
    }

    #[test]
    fn terminates_a_real_child_process() {
        use std::os::unix::process::ExitStatusExt;

        let mut child = Command::new("sleep")
            .arg("60")
            .spawn()
            .expect("spawn sleep");
        let raw = i32::try_from(child.id()).expect("pid fits in i32");
        let outcomes = SignalTerminator::new(SystemSignalSender)
            .terminate(Pid::from_raw(raw))
            .expect("termination should succeed");
        assert_eq!(outcomes.len(), 3);
        let status = child.wait().expect("wait for child");
        assert_eq!(status.signal(), Some(Signal::SIGTERM as i32));
    }

    #[test]
    fn absent_process_is_treated_as_already_gone() {
        // Spawn and reap a child so its pid is known to be free.
        let mut child = Command::new("true").spawn().expect("spawn true");
        let raw = i32::try_from(child.id()).expect("pid fits in i32");
        child.wait().expect("reap child");
        let outcomes = SignalTerminator::new(SystemSignalSender)
            .terminate(Pid::from_raw(raw))
            .expect("absence counts as success");
        assert!(
            outcomes
                .iter()
                .all(|outcome| outcome.delivery == Delivery::AlreadyGone)
        );
    }
}
