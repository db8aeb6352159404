//! Event bus integration tests.
//!
//! These tests register handlers on an engine's event bus and check the
//! sequence of lifecycle events each kind of run produces, along with how
//! misbehaving handlers affect a run.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use taskdeck::{Event, EventBus, EventHandler, TaskEngine, TaskId, TaskStatus};
use tempfile::TempDir;
use tokio::sync::Mutex;

use crate::common::{sh_task, wait_for_finish, write_script};

const TIMEOUT: Duration = Duration::from_secs(10);

/// Records every event it receives.
struct RecordingHandler {
    events: Mutex<Vec<Event>>,
}

impl RecordingHandler {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    async fn events_for(&self, id: &TaskId) -> Vec<Event> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.task_id() == id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: &Event) {
        self.events.lock().await.push(event.clone());
    }
}

/// Panics whenever a line of output is captured.
struct PanickingHandler;

#[async_trait]
impl EventHandler for PanickingHandler {
    async fn handle(&self, event: &Event) {
        if let Event::TaskOutput { .. } = event {
            panic!("output handler failed");
        }
    }
}

/// Takes a while over every captured line.
struct SlowHandler;

#[async_trait]
impl EventHandler for SlowHandler {
    async fn handle(&self, event: &Event) {
        if let Event::TaskOutput { .. } = event {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

async fn engine_with_recorder(dir: &TempDir) -> (TaskEngine, Arc<RecordingHandler>) {
    let recorder = Arc::new(RecordingHandler::new());
    let bus = EventBus::new();
    bus.register(recorder.clone()).await;
    let engine = TaskEngine::new(dir.path().join("logs"))
        .unwrap()
        .with_event_bus(bus);
    (engine, recorder)
}

/// Terminal events are emitted after the table is updated, so give the
/// handler a moment to observe them once polling sees the final state.
async fn settled_events(recorder: &RecordingHandler, id: &TaskId) -> Vec<Event> {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        let events = recorder.events_for(id).await;
        if events.last().is_some_and(Event::is_terminal) {
            return events;
        }
        assert!(tokio::time::Instant::now() < deadline, "no terminal event");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Test: A successful run emits started, one output per line, then completed.
#[tokio::test]
async fn test_success_event_sequence() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "two.sh", "echo one\necho two");
    let (engine, recorder) = engine_with_recorder(&dir).await;

    let id = engine.create_task_with(sh_task("ana", &script)).unwrap();
    engine.execute_task(&id).unwrap();
    wait_for_finish(&engine, &id, TIMEOUT).await;
    let events = settled_events(&recorder, &id).await;

    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], Event::TaskStarted { .. }));
    match (&events[1], &events[2]) {
        (
            Event::TaskOutput {
                line: first,
                progress: p1,
                ..
            },
            Event::TaskOutput {
                line: second,
                progress: p2,
                ..
            },
        ) => {
            assert_eq!(first, "one\n");
            assert_eq!(second, "two\n");
            assert_eq!((*p1, *p2), (5, 10));
        }
        other => panic!("Expected two TaskOutput events, got {:?}", other),
    }
    assert!(matches!(
        events[3],
        Event::TaskCompleted { return_code: 0, .. }
    ));
}

/// Test: A nonzero exit ends with a failed event carrying the exit code.
#[tokio::test]
async fn test_failure_event_carries_return_code() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "bad.sh", "exit 7");
    let (engine, recorder) = engine_with_recorder(&dir).await;

    let id = engine.create_task_with(sh_task("ben", &script)).unwrap();
    engine.execute_task(&id).unwrap();
    let task = wait_for_finish(&engine, &id, TIMEOUT).await;
    let events = settled_events(&recorder, &id).await;

    assert_eq!(task.status, TaskStatus::Failed);
    assert!(matches!(events[0], Event::TaskStarted { .. }));
    match events.last().unwrap() {
        Event::TaskFailed {
            error, return_code, ..
        } => {
            assert_eq!(*return_code, Some(7));
            assert_eq!(error, &task.error);
        }
        other => panic!("Expected TaskFailed event, got {:?}", other),
    }
}

/// Test: A launch failure emits a failed event and never a started event.
#[tokio::test]
async fn test_launch_failure_skips_started_event() {
    let dir = TempDir::new().unwrap();
    let (engine, recorder) = engine_with_recorder(&dir).await;

    let id = engine
        .create_task("cy", dir.path().join("missing.sh"), Vec::new())
        .unwrap();
    engine.execute_task(&id).unwrap();
    wait_for_finish(&engine, &id, TIMEOUT).await;
    let events = settled_events(&recorder, &id).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        Event::TaskFailed {
            return_code: None,
            ..
        }
    ));
}

/// Test: A panicking handler fails the task instead of leaving it running.
#[tokio::test]
async fn test_panicking_handler_fails_task() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "hi.sh", "echo hi");
    let (engine, recorder) = engine_with_recorder(&dir).await;
    engine.events().register(Arc::new(PanickingHandler)).await;

    let id = engine.create_task_with(sh_task("dee", &script)).unwrap();
    engine.execute_task(&id).unwrap();
    let task = wait_for_finish(&engine, &id, TIMEOUT).await;
    let events = settled_events(&recorder, &id).await;

    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error.contains("output handler failed"));
    assert_eq!(task.progress, 100);
    assert!(task.completed_at.is_some());
    assert!(matches!(
        events.last().unwrap(),
        Event::TaskFailed {
            return_code: None,
            ..
        }
    ));
}

/// Test: A slow handler does not hold the script back on a full pipe.
#[tokio::test]
async fn test_slow_handler_does_not_stall_script() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("all-written");
    let padding = "x".repeat(100);
    let script = write_script(
        dir.path(),
        "loud.sh",
        &format!(
            "i=1\nwhile [ $i -le 2000 ]; do echo \"$i {}\"; i=$((i+1)); done\ntouch \"$1\"\nsleep 5",
            padding
        ),
    );
    let bus = EventBus::new();
    bus.register(Arc::new(SlowHandler)).await;
    let engine = TaskEngine::new(dir.path().join("logs"))
        .unwrap()
        .with_event_bus(bus);

    let new = sh_task("eli", &script).with_args(vec![marker.display().to_string()]);
    let id = engine.create_task_with(new).unwrap();
    engine.execute_task(&id).unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !marker.exists() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "script blocked writing its output"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let task = engine.get_task(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Running);
    assert!(task.output.lines().count() < 2000);
}
