// SPDX-License-Identifier: MIT

//! One-shot Turn Runner (spec §4.2.2.A, §6.3): a child process reads the
//! prompt on stdin, writes the final JSON to a specified output file, and
//! exits 0 on success. Stderr carries a `session id: <id>` line once the
//! thread exists.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

use crate::contract::{RunnerError, TurnOutcome, TurnOutput, TurnRequest, TurnRunner, WatchHandle, WatchSignal};

const SESSION_ID_PREFIX: &str = "session id: ";

#[derive(Clone, Default)]
pub struct OneShotRunner;

impl OneShotRunner {
    pub fn new() -> Self {
        Self
    }

    fn build_command(&self, request: &TurnRequest) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&request.command)
            .current_dir(&request.cwd)
            .env("AGENTBUS_OUTPUT_PATH", &request.output_path)
            .env("AGENTBUS_OUTPUT_SCHEMA_REF", &request.output_schema_ref)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(resume) = &request.resume_thread_id {
            cmd.env("AGENTBUS_RESUME_THREAD_ID", resume);
        }
        cmd
    }

    async fn terminate(child: &mut Child, kill_grace: std::time::Duration) {
        if let Some(pid) = child.id() {
            tracing::debug!(pid, "terminating one-shot turn");
        }
        // Cooperative: ask the child to exit, then escalate after a grace
        // period. tokio::process has no portable SIGTERM without `nix`,
        // so cooperative shutdown is start_kill with a bounded wait.
        let _ = child.start_kill();
        let _ = tokio::time::timeout(kill_grace, child.wait()).await;
    }
}

#[async_trait]
impl TurnRunner for OneShotRunner {
    async fn run_turn(&self, request: TurnRequest, mut watch: WatchHandle) -> TurnOutcome {
        let mut cmd = self.build_command(&request);
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return TurnOutcome::Fatal(RunnerError::SpawnFailed(e.to_string())),
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(request.prompt.as_bytes()).await {
                return TurnOutcome::Fatal(RunnerError::Io(e));
            }
        }

        let stderr = child.stderr.take();
        let thread_id = std::sync::Arc::new(parking_lot::Mutex::new(None::<String>));
        let thread_id_writer = thread_id.clone();
        let stderr_task = stderr.map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(id) = line.strip_prefix(SESSION_ID_PREFIX) {
                        *thread_id_writer.lock() = Some(id.trim().to_string());
                    }
                }
            })
        });

        let outcome = tokio::select! {
            status = child.wait() => Self::finish(status, &request, thread_id.lock().clone()).await,
            signal = watch.cancelled() => {
                Self::terminate(&mut child, request.kill_grace).await;
                match signal {
                    WatchSignal::Supersede => TurnOutcome::Superseded { thread_id: thread_id.lock().clone() },
                    _ => TurnOutcome::TimedOut { thread_id: thread_id.lock().clone() },
                }
            }
            _ = tokio::time::sleep(request.timeout) => {
                Self::terminate(&mut child, request.kill_grace).await;
                TurnOutcome::TimedOut { thread_id: thread_id.lock().clone() }
            }
        };

        if let Some(task) = stderr_task {
            task.abort();
        }
        outcome
    }
}

impl OneShotRunner {
    async fn finish(
        status: std::io::Result<std::process::ExitStatus>,
        request: &TurnRequest,
        thread_id: Option<String>,
    ) -> TurnOutcome {
        let status = match status {
            Ok(status) => status,
            Err(e) => return TurnOutcome::Fatal(RunnerError::Io(e)),
        };
        if !status.success() {
            return TurnOutcome::Fatal(RunnerError::SpawnFailed(format!(
                "turn exited with {status}"
            )));
        }
        let bytes = match tokio::fs::read(&request.output_path).await {
            Ok(bytes) => bytes,
            Err(e) => return TurnOutcome::Fatal(RunnerError::Io(e)),
        };
        let value: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => return TurnOutcome::Fatal(RunnerError::MalformedOutput(e.to_string())),
        };
        let Some(thread_id) = thread_id else {
            return TurnOutcome::Fatal(RunnerError::MalformedOutput(
                "no session id line observed on stderr".to_string(),
            ));
        };
        TurnOutcome::Completed(TurnOutput {
            thread_id,
            output_path: request.output_path.clone(),
            value,
        })
    }
}
