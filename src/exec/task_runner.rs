// src/exec/task_runner.rs

//! Single action process runner.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::{TaskName, TaskOutcome};

use super::backend::ActionInvocation;

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Run one action through the platform shell and wait for it.
///
/// Output is echoed according to the invocation's verbosity and logged at
/// `debug` otherwise, so pipes never fill up.
pub async fn run_action(invocation: &ActionInvocation, working_dir: Option<&Path>) -> Result<TaskOutcome> {
    info!(
        task = %invocation.task,
        action = invocation.index,
        cmd = %invocation.command,
        "running action"
    );

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&invocation.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&invocation.command);
        c
    };

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning action {invocation}"))?;

    let readers = [
        child
            .stdout
            .take()
            .map(|s| forward(s, invocation.task.clone(), Stream::Stdout, invocation.verbosity.echo_stdout())),
        child
            .stderr
            .take()
            .map(|s| forward(s, invocation.task.clone(), Stream::Stderr, invocation.verbosity.echo_stderr())),
    ];

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for action {invocation}"))?;

    for reader in readers.into_iter().flatten() {
        // A reader only ends early if the pipe breaks; the exit status is
        // what matters.
        let _ = reader.await;
    }

    let code = status.code().unwrap_or(-1);
    info!(
        task = %invocation.task,
        action = invocation.index,
        exit_code = code,
        success = status.success(),
        "action exited"
    );

    Ok(if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failed(code)
    })
}

fn forward<R>(stream: R, task: TaskName, kind: Stream, echo: bool) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match (kind, echo) {
                (Stream::Stdout, true) => println!("{line}"),
                (Stream::Stderr, true) => eprintln!("{line}"),
                (Stream::Stdout, false) => debug!(task = %task, "stdout: {}", line),
                (Stream::Stderr, false) => debug!(task = %task, "stderr: {}", line),
            }
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::types::Verbosity;

    fn invocation(command: &str) -> ActionInvocation {
        ActionInvocation {
            task: "t".to_string(),
            index: 0,
            command: command.to_string(),
            verbosity: Verbosity::QUIET,
        }
    }

    #[tokio::test]
    async fn exit_status_becomes_outcome() {
        assert_eq!(
            run_action(&invocation("true"), None).await.unwrap(),
            TaskOutcome::Success
        );
        assert_eq!(
            run_action(&invocation("echo noisy >&2; exit 3"), None).await.unwrap(),
            TaskOutcome::Failed(3)
        );
    }

    #[tokio::test]
    async fn runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_action(&invocation("touch made.txt"), Some(dir.path()))
            .await
            .unwrap();
        assert_eq!(outcome, TaskOutcome::Success);
        assert!(dir.path().join("made.txt").exists());
    }
}
