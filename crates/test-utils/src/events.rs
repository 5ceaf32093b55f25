//! Helpers for draining event and runner-message channels in tests.

use rorsch::engine::Event;
use rorsch::exec::{RunnerMessage, RunnerMessageKind};
use rorsch::types::RunId;
use tokio::sync::mpsc;

/// Receive events until one satisfies `pred`.
///
/// Returns everything received, the matching event last. Panics if the
/// stream closes first.
pub async fn collect_until<F>(rx: &mut mpsc::Receiver<Event>, mut pred: F) -> Vec<Event>
where
    F: FnMut(&Event) -> bool,
{
    let mut seen = Vec::new();
    while let Some(event) = rx.recv().await {
        let done = pred(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
    panic!("event stream closed before the expected event; got {seen:?}");
}

/// Receive events until `command` has completed `count` runs.
pub async fn collect_completions(
    rx: &mut mpsc::Receiver<Event>,
    command: &str,
    count: usize,
) -> Vec<Event> {
    let mut remaining = count;
    collect_until(rx, |event| {
        if is_completion(event, command) {
            remaining -= 1;
        }
        remaining == 0
    })
    .await
}

pub fn is_completion(event: &Event, command: &str) -> bool {
    matches!(event, Event::RunCompleted { command: c, .. } if c == command)
}

/// Output lines of `command`, in order.
pub fn output_lines(events: &[Event], command: &str) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::OutputLine { command: c, text, .. } if c == command => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Receive runner messages until run `run` has finished.
pub async fn collect_run(rx: &mut mpsc::Receiver<RunnerMessage>, run: RunId) -> Vec<RunnerMessage> {
    let mut seen = Vec::new();
    while let Some(message) = rx.recv().await {
        let done = message.run == run && matches!(message.kind, RunnerMessageKind::Finished(_));
        seen.push(message);
        if done {
            return seen;
        }
    }
    panic!("runner channel closed before run {run} finished; got {seen:?}");
}

/// Lines of one run, in order.
pub fn run_lines(messages: &[RunnerMessage], run: RunId) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.run == run)
        .filter_map(|m| match &m.kind {
            RunnerMessageKind::Line(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}
