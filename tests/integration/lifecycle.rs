//! Task lifecycle integration tests.
//!
//! These tests run real scripts through the engine and check the observable
//! state at each stage.

use std::time::Duration;
use taskdeck::{EngineError, TaskEngine, TaskStatus};
use tempfile::TempDir;

use crate::common::{sh_task, wait_for_finish, wait_for_task_status, write_script};

const TIMEOUT: Duration = Duration::from_secs(10);

/// Test: A task stays pending until it is executed.
#[tokio::test]
async fn test_task_pending_until_executed() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "hello.sh", "echo hello");
    let engine = TaskEngine::new(dir.path().join("logs")).unwrap();

    let id = engine.create_task_with(sh_task("alice", &script)).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let task = engine.get_task(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.progress, 0);
    assert!(task.output.is_empty());
    assert_eq!(engine.read_log_file(&id).await.unwrap(), "");
}

/// Test: A running task reports partial output and bounded progress.
#[tokio::test]
async fn test_running_task_reports_partial_output() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "gated.sh", "echo first\nsleep 1\necho second");
    let engine = TaskEngine::new(dir.path()).unwrap();

    let id = engine.create_task_with(sh_task("bob", &script)).unwrap();
    engine.execute_task(&id).unwrap();

    let task = wait_for_task_status(&engine, &id, TaskStatus::Running, TIMEOUT).await;
    assert!(task.started_at.is_some());
    assert!(task.completed_at.is_none());

    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        let task = engine.get_task(&id).unwrap();
        if task.output == "first\n" {
            assert_eq!(task.status, TaskStatus::Running);
            assert_eq!(task.progress, 5);
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "first line never arrived");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let task = wait_for_finish(&engine, &id, TIMEOUT).await;
    assert_eq!(task.status, TaskStatus::Success);
    assert_eq!(task.output, "first\nsecond\n");
    assert_eq!(task.progress, 100);
}

/// Test: Progress saturates at 95 while running, whatever the line count.
#[tokio::test]
async fn test_progress_caps_below_completion() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        dir.path(),
        "chatty.sh",
        "i=1\nwhile [ $i -le 40 ]; do echo line $i; i=$((i+1)); done\nsleep 1",
    );
    let engine = TaskEngine::new(dir.path()).unwrap();

    let id = engine.create_task_with(sh_task("carl", &script)).unwrap();
    engine.execute_task(&id).unwrap();

    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        let task = engine.get_task(&id).unwrap();
        if task.output.lines().count() == 40 {
            assert_eq!(task.status, TaskStatus::Running);
            assert_eq!(task.progress, 95);
            break;
        }
        assert!(task.progress <= 95);
        assert!(tokio::time::Instant::now() < deadline, "output never arrived");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let task = wait_for_finish(&engine, &id, TIMEOUT).await;
    assert_eq!(task.progress, 100);
}

/// Test: stdout and stderr are merged into one output stream.
#[tokio::test]
async fn test_stdout_and_stderr_are_combined() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        dir.path(),
        "mixed.sh",
        "echo out\nsleep 0.1\necho err >&2\nsleep 0.1\necho out again",
    );
    let engine = TaskEngine::new(dir.path()).unwrap();

    let id = engine.create_task_with(sh_task("dora", &script)).unwrap();
    engine.execute_task(&id).unwrap();
    let task = wait_for_finish(&engine, &id, TIMEOUT).await;

    assert_eq!(task.status, TaskStatus::Success);
    assert_eq!(task.output, "out\nerr\nout again\n");
    assert_eq!(engine.read_log_file(&id).await.unwrap(), task.output);
}

/// Test: A failing script keeps its output and records stderr as the error.
#[tokio::test]
async fn test_failure_records_stderr() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        dir.path(),
        "broken.sh",
        "echo working\necho disk full >&2\nexit 3",
    );
    let engine = TaskEngine::new(dir.path()).unwrap();

    let id = engine.create_task_with(sh_task("ed", &script)).unwrap();
    engine.execute_task(&id).unwrap();
    let task = wait_for_finish(&engine, &id, TIMEOUT).await;

    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.return_code, Some(3));
    assert_eq!(task.error.trim_end(), "disk full");
    assert!(task.output.contains("working\n"));
    assert!(task.output.contains("disk full\n"));
    assert!(task.started_at.is_some());
    assert!(task.completed_at.is_some());
}

/// Test: Arguments reach the script verbatim.
#[tokio::test]
async fn test_args_passed_verbatim() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        dir.path(),
        "args.sh",
        "for arg in \"$@\"; do echo \"[$arg]\"; done",
    );
    let engine = TaskEngine::new(dir.path()).unwrap();

    let new = sh_task("fay", &script).with_args(vec![
        "plain".to_string(),
        "with space".to_string(),
        "$HOME".to_string(),
    ]);
    let id = engine.create_task_with(new).unwrap();
    engine.execute_task(&id).unwrap();
    let task = wait_for_finish(&engine, &id, TIMEOUT).await;

    assert_eq!(task.output, "[plain]\n[with space]\n[$HOME]\n");
}

/// Test: Executing a finished task is rejected and leaves it untouched.
#[tokio::test]
async fn test_finished_task_cannot_be_rerun() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "once.sh", "echo once");
    let engine = TaskEngine::new(dir.path()).unwrap();

    let id = engine.create_task_with(sh_task("gus", &script)).unwrap();
    engine.execute_task(&id).unwrap();
    let before = wait_for_finish(&engine, &id, TIMEOUT).await;

    let result = engine.execute_task(&id);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(matches!(result, Err(EngineError::AlreadyStarted(_))));
    let after = engine.get_task(&id).unwrap();
    assert_eq!(after.output, before.output);
    assert_eq!(after.completed_at, before.completed_at);
}

/// Test: Many tasks run side by side and each keeps its own output.
#[tokio::test]
async fn test_concurrent_tasks_keep_separate_output() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        dir.path(),
        "tag.sh",
        "echo \"$1 start\"\nsleep 0.2\necho \"$1 end\"",
    );
    let engine = TaskEngine::new(dir.path().join("logs")).unwrap();

    let ids: Vec<_> = (0..10)
        .map(|n| {
            let new = sh_task(&format!("user-{}", n), &script).with_args(vec![format!("t{}", n)]);
            let id = engine.create_task_with(new).unwrap();
            engine.execute_task(&id).unwrap();
            id
        })
        .collect();

    for (n, id) in ids.iter().enumerate() {
        let task = wait_for_finish(&engine, id, TIMEOUT).await;
        assert_eq!(task.status, TaskStatus::Success);
        assert_eq!(task.output, format!("t{n} start\nt{n} end\n"));
        assert_eq!(engine.read_log_file(id).await.unwrap(), task.output);
    }

    let logs: Vec<_> = std::fs::read_dir(dir.path().join("logs"))
        .unwrap()
        .collect();
    assert_eq!(logs.len(), 10);
}
