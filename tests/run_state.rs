// tests/run_state.rs

use rorsch::engine::{Event, RunState, UnitInput};
use rorsch::errors::RunError;
use rorsch::exec::{RunnerMessage, RunnerMessageKind};
use rorsch::types::{RunId, RunStatus};
use rorsch::watch::WatchSignal;

fn msg(run: RunId, kind: RunnerMessageKind) -> UnitInput {
    UnitInput::Runner(RunnerMessage {
        command: "build".to_string(),
        run,
        kind,
    })
}

fn line(run: RunId, text: &str) -> UnitInput {
    msg(run, RunnerMessageKind::Line(text.to_string()))
}

fn started(run: RunId, pid: u32) -> UnitInput {
    msg(run, RunnerMessageKind::Started { pid })
}

fn finished(run: RunId, result: Result<(), RunError>) -> UnitInput {
    msg(run, RunnerMessageKind::Finished(result))
}

fn failure() -> RunError {
    RunError::Exited {
        code: None,
        signal: Some(9),
    }
}

#[test]
fn restart_requests_a_run_without_events() {
    let mut state = RunState::new("build");
    assert_eq!(state.status(), RunStatus::Idle);

    let step = state.step(UnitInput::Restart);
    assert!(step.start_run);
    assert!(step.events.is_empty());
    assert_eq!(state.status(), RunStatus::Running);
    assert!(state.is_awaiting_run());
}

#[test]
fn a_run_moves_through_running_to_succeeded() {
    let mut state = RunState::new("build");
    state.step(UnitInput::Restart);

    let step = state.step(started(1, 42));
    assert_eq!(
        step.events,
        vec![Event::RunStarted {
            command: "build".to_string(),
            run: 1,
            pid: 42
        }]
    );
    assert!(!step.start_run);
    assert_eq!(state.pid(), Some(42));
    assert_eq!(state.current_run(), Some(1));
    assert!(!state.is_awaiting_run());

    state.step(line(1, "compiling"));
    state.step(line(1, "done"));
    assert_eq!(state.log(), ["compiling", "done"]);

    let step = state.step(finished(1, Ok(())));
    assert_eq!(
        step.events,
        vec![Event::RunCompleted {
            command: "build".to_string(),
            run: 1,
            ok: true,
            error: None
        }]
    );
    assert_eq!(state.status(), RunStatus::Succeeded);
    assert_eq!(state.pid(), None);
    assert_eq!(state.log(), ["compiling", "done"], "log survives completion");
}

#[test]
fn change_resets_the_log_and_ignores_the_superseded_run() {
    let mut state = RunState::new("build");
    state.step(UnitInput::Restart);
    state.step(started(1, 10));
    state.step(line(1, "old"));

    let step = state.step(UnitInput::Watch(WatchSignal::Changed(
        "src/main.go (write)".to_string(),
    )));
    assert!(step.start_run);
    assert_eq!(
        step.events,
        vec![Event::ChangeDetected {
            command: "build".to_string(),
            description: "src/main.go (write)".to_string()
        }]
    );
    assert!(state.log().is_empty());
    assert_eq!(state.status(), RunStatus::Running);

    // Late output and the kill of run 1 are relayed but not recorded.
    let step = state.step(line(1, "late"));
    assert_eq!(step.events.len(), 1);
    let step = state.step(finished(1, Err(failure())));
    assert!(matches!(
        step.events.as_slice(),
        [Event::RunCompleted { run: 1, ok: false, .. }]
    ));
    assert!(state.log().is_empty());
    assert_eq!(state.status(), RunStatus::Running);

    state.step(started(2, 11));
    state.step(line(2, "new"));
    assert_eq!(state.log(), ["new"]);
    assert_eq!(state.pid(), Some(11));
}

#[test]
fn spawn_failure_of_the_current_run_marks_it_failed() {
    let mut state = RunState::new("build");
    state.step(UnitInput::Restart);

    let err = RunError::Spawn {
        program: "nope".to_string(),
        message: "No such file or directory".to_string(),
    };
    let step = state.step(finished(1, Err(err.clone())));
    assert_eq!(
        step.events,
        vec![Event::RunCompleted {
            command: "build".to_string(),
            run: 1,
            ok: false,
            error: Some(err)
        }]
    );
    assert_eq!(state.status(), RunStatus::Failed);
    assert_eq!(state.current_run(), Some(1));
}

#[test]
fn back_to_back_changes_only_track_the_latest_run() {
    let mut state = RunState::new("build");
    state.step(UnitInput::Restart);
    state.step(UnitInput::Watch(WatchSignal::Changed("a (write)".to_string())));
    state.step(UnitInput::Watch(WatchSignal::Changed("b (write)".to_string())));

    // Run 3 is the one that counts, even if run 2 reports first.
    state.step(started(2, 20));
    state.step(line(2, "two"));
    assert!(state.log().is_empty());
    assert!(state.is_awaiting_run());

    state.step(started(3, 30));
    state.step(line(3, "three"));
    assert_eq!(state.log(), ["three"]);
    assert_eq!(state.pid(), Some(30));
}

#[test]
fn warnings_and_stops_are_only_relayed() {
    let mut state = RunState::new("build");
    state.step(UnitInput::Restart);
    state.step(started(1, 5));

    let step = state.step(UnitInput::Watch(WatchSignal::Warning("boom".to_string())));
    assert!(!step.start_run);
    assert_eq!(
        step.events,
        vec![Event::WatchWarning {
            command: "build".to_string(),
            message: "boom".to_string()
        }]
    );

    let step = state.step(UnitInput::Stopped {
        error: Some("EPERM".to_string()),
    });
    assert!(!step.start_run);
    assert_eq!(
        step.events,
        vec![Event::RunStopped {
            command: "build".to_string(),
            error: Some("EPERM".to_string())
        }]
    );
    assert_eq!(state.status(), RunStatus::Running);
    assert_eq!(state.pid(), Some(5));
}
