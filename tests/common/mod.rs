//! Common test utilities shared across integration tests.

use std::path::{Path, PathBuf};
use std::time::Duration;
use taskdeck::{NewTask, Task, TaskEngine, TaskId, TaskStatus};

/// Write a shell script into `dir` and return its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    path
}

/// A task request that runs `script` through `sh`.
pub fn sh_task(user: &str, script: &Path) -> NewTask {
    NewTask::new(user, script).with_interpreter(Some("sh".to_string()))
}

/// Wait for a task to reach an expected status, polling the engine.
///
/// This is more reliable than fixed sleeps since execution time can vary.
/// Polls every 10ms and times out after the specified duration.
///
/// # Panics
///
/// Panics if the timeout is reached before the task reaches the expected status.
pub async fn wait_for_task_status(
    engine: &TaskEngine,
    id: &TaskId,
    expected: TaskStatus,
    timeout: Duration,
) -> Task {
    let start = tokio::time::Instant::now();
    loop {
        let task = engine.get_task(id).unwrap();
        if task.status == expected {
            return task;
        }
        if start.elapsed() > timeout {
            panic!(
                "Timeout waiting for task {} to reach {:?}, current status: {:?}",
                id, expected, task.status
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait for a task to reach any terminal status.
pub async fn wait_for_finish(engine: &TaskEngine, id: &TaskId, timeout: Duration) -> Task {
    tokio::time::timeout(
        timeout,
        engine.wait_for_completion(id, Duration::from_millis(10)),
    )
    .await
    .unwrap_or_else(|_| panic!("Timeout waiting for task {} to finish", id))
    .unwrap()
}
