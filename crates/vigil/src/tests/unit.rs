//! Unit tests for the controller, dispatcher, and daemon entry point.

use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use nix::errno::Errno;
use nix::unistd::{Pid, getpid};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use vigil_config::StreamRedirection;

use crate::dispatch::{Action, ActionDispatcher, DispatchError};
use crate::lifecycle::{LifecycleController, LifecycleError, LifecycleState, StopMode};
use crate::process::TerminateError;
use crate::service::Daemon;
use crate::tests::support::{RecordingDetacher, RecordingSignalSender};

type TestController = LifecycleController<RecordingDetacher, RecordingSignalSender>;

struct Harness {
    dir: TempDir,
    detacher: RecordingDetacher,
    sender: RecordingSignalSender,
}

impl Harness {
    fn pid_path(&self) -> PathBuf {
        self.dir.path().join("service.pid")
    }

    fn controller(&self) -> TestController {
        LifecycleController::new(self.detacher.clone(), self.sender.clone())
    }

    fn dispatcher(&self) -> ActionDispatcher<RecordingDetacher, RecordingSignalSender> {
        ActionDispatcher::new(self.controller())
    }

    fn seed_pid(&self, content: &str) {
        fs::write(self.pid_path(), content).expect("seed pid file");
    }
}

#[fixture]
fn harness() -> Harness {
    Harness {
        dir: TempDir::new().expect("create temp dir"),
        detacher: RecordingDetacher::default(),
        sender: RecordingSignalSender::default(),
    }
}

#[rstest]
fn state_follows_the_pid_file(harness: Harness) {
    let controller = harness.controller();
    let state = controller.state(&harness.pid_path()).expect("read state");
    assert_eq!(state, LifecycleState::NotRunning);

    harness.seed_pid("31337\n");
    let state = controller.state(&harness.pid_path()).expect("read state");
    assert_eq!(
        state,
        LifecycleState::Running {
            pid: Pid::from_raw(31337)
        }
    );
}

#[rstest]
fn malformed_pid_file_blocks_start(harness: Harness) {
    harness.seed_pid("garbage\n");
    let error = harness
        .controller()
        .start(|| ExitCode::SUCCESS, &harness.pid_path(), &StreamRedirection::default())
        .expect_err("malformed pid file should fail");
    assert!(matches!(error, LifecycleError::PidFile(_)), "{error:?}");
    assert_eq!(harness.detacher.calls(), 0);
}

#[rstest]
fn start_passes_absolute_redirection_to_the_detacher(harness: Harness) {
    let redirection = StreamRedirection::default().with_stdout("relative/out.log");
    harness
        .controller()
        .start(|| ExitCode::SUCCESS, &harness.pid_path(), &redirection)
        .expect("start should succeed");
    let requests = harness.detacher.requests();
    let [request] = requests.as_slice() else {
        panic!("expected one detach request, got {requests:?}");
    };
    assert!(request.stdout().is_absolute());
    assert!(request.stdout().ends_with("relative/out.log"));
}

#[rstest]
fn pid_file_is_removed_even_when_the_job_fails(harness: Harness) {
    let ran = Cell::new(false);
    harness
        .controller()
        .start(
            || {
                ran.set(true);
                ExitCode::FAILURE
            },
            &harness.pid_path(),
            &StreamRedirection::default(),
        )
        .expect("start should succeed");
    assert!(ran.get());
    assert!(!harness.pid_path().exists());
}

#[rstest]
#[case::strict(StopMode::Strict, false)]
#[case::tolerant(StopMode::Tolerant, true)]
fn stop_without_pid_file_depends_on_mode(
    harness: Harness,
    #[case] mode: StopMode,
    #[case] succeeds: bool,
) {
    let result = harness.controller().stop(&harness.pid_path(), mode);
    assert_eq!(result.is_ok(), succeeds, "{result:?}");
    assert!(harness.sender.sent().is_empty());
}

#[rstest]
fn stale_pid_file_is_cleared_by_stop(harness: Harness) {
    harness.seed_pid("4242\n");
    let controller = harness.controller();
    let refused = controller
        .start(|| ExitCode::SUCCESS, &harness.pid_path(), &StreamRedirection::default())
        .expect_err("recorded pid should block start");
    let message = refused.to_string();
    assert!(message.contains("run stop"), "{message}");
    assert!(message.contains("already exited"), "{message}");

    harness.sender.respond_with(Err(Errno::ESRCH));
    controller
        .stop(&harness.pid_path(), StopMode::Strict)
        .expect("a vanished process still counts as stopped");
    assert!(!harness.pid_path().exists());

    controller
        .start(|| ExitCode::SUCCESS, &harness.pid_path(), &StreamRedirection::default())
        .expect("start should succeed once the file is gone");
    assert_eq!(harness.detacher.calls(), 1);
}

#[rstest]
fn fatal_delivery_error_keeps_the_pid_file(harness: Harness) {
    harness.seed_pid("4242\n");
    harness.sender.respond_with(Err(Errno::EPERM));
    let error = harness
        .controller()
        .stop(&harness.pid_path(), StopMode::Strict)
        .expect_err("EPERM should be fatal");
    assert!(matches!(
        error,
        LifecycleError::Terminate(TerminateError::SignalDelivery { .. })
    ));
    assert!(harness.pid_path().exists());
}

#[rstest]
fn unknown_action_is_rejected_before_any_process_work(harness: Harness) {
    harness.seed_pid("4242\n");
    let error = harness
        .dispatcher()
        .dispatch(
            "bogus",
            || ExitCode::SUCCESS,
            &harness.pid_path(),
            &StreamRedirection::default(),
        )
        .expect_err("bogus should be rejected");
    assert_eq!(
        error.to_string(),
        "unknown action 'bogus'; expected one of: restart, start, stop"
    );
    assert_eq!(harness.detacher.calls(), 0);
    assert!(harness.sender.sent().is_empty());
}

#[rstest]
fn dispatched_stop_is_strict(harness: Harness) {
    let error = harness
        .dispatcher()
        .execute(
            Action::Stop,
            || ExitCode::SUCCESS,
            &harness.pid_path(),
            &StreamRedirection::default(),
        )
        .expect_err("stop without a pid file should fail");
    assert!(matches!(
        error,
        DispatchError::Lifecycle(LifecycleError::NotRunning { .. })
    ));
}

#[rstest]
fn dispatched_start_runs_the_job(harness: Harness) {
    let ran = Cell::new(false);
    harness
        .dispatcher()
        .dispatch(
            "start",
            || {
                ran.set(true);
                ExitCode::SUCCESS
            },
            &harness.pid_path(),
            &StreamRedirection::default(),
        )
        .expect("start should succeed");
    assert!(ran.get());
    let dispatcher = harness.dispatcher();
    let state = dispatcher
        .controller()
        .state(&harness.pid_path())
        .expect("read state");
    assert_eq!(state, LifecycleState::NotRunning);
}

#[rstest]
fn daemon_reports_failures_to_the_error_stream(harness: Harness) {
    harness.seed_pid("4242\n");
    let mut errors = Vec::new();
    let _status = Daemon::new(harness.pid_path()).run_with(
        &harness.dispatcher(),
        "start",
        || ExitCode::SUCCESS,
        &mut errors,
    );
    let message = String::from_utf8(errors).expect("utf-8 error output");
    assert!(message.contains("already running with pid 4242"), "{message}");
    assert_eq!(harness.detacher.calls(), 0);
}

#[rstest]
fn daemon_forwards_redirection_to_the_detacher(harness: Harness) {
    let mut errors = Vec::new();
    let ran = Cell::new(false);
    Daemon::new(harness.pid_path())
        .stdout("/var/log/vigil/out.log")
        .stderr("/var/log/vigil/err.log")
        .run_with(
            &harness.dispatcher(),
            "start",
            || {
                ran.set(true);
                assert_eq!(
                    crate::pidfile::read(&harness.pid_path()).ok().flatten(),
                    Some(getpid())
                );
                ExitCode::SUCCESS
            },
            &mut errors,
        );
    assert!(ran.get());
    assert!(errors.is_empty());
    let requests = harness.detacher.requests();
    let [request] = requests.as_slice() else {
        panic!("expected one detach request, got {requests:?}");
    };
    assert_eq!(request.stdout(), "/var/log/vigil/out.log");
    assert_eq!(request.stderr(), "/var/log/vigil/err.log");
    assert_eq!(request.stdin(), vigil_config::NULL_DEVICE);
}

#[test]
fn repeating_daemon_job_honours_the_count() {
    let dir = TempDir::new().expect("create temp dir");
    let dispatcher = ActionDispatcher::new(LifecycleController::new(
        RecordingDetacher::default(),
        RecordingSignalSender::default(),
    ));
    let mut runs = 0;
    let daemon = Daemon::new(dir.path().join("ticker.pid"));
    let mut errors = Vec::new();
    daemon.run_with(
        &dispatcher,
        "start",
        || {
            crate::schedule::Repeat::every(Duration::ZERO)
                .times(3)
                .run(|| runs += 1);
            ExitCode::SUCCESS
        },
        &mut errors,
    );
    assert_eq!(runs, 3);
}
