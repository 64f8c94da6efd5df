// SPDX-License-Identifier: MIT

//! Long-lived JSON-RPC Turn Runner (spec §4.2.2.B, §6.3): one child
//! process per agent, kept alive across turns, spoken to over a
//! line-delimited request/response + notification protocol.

use std::collections::{HashMap, VecDeque};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{broadcast, oneshot};

use crate::contract::{
    RunnerError, TurnOutcome, TurnOutput, TurnRequest, TurnRunner, WatchHandle, WatchSignal,
};
use crate::rpc::{RpcNotification, RpcRequest, TurnStatus};

struct ChildProc {
    child: Child,
    stdin: ChildStdin,
    notify_tx: broadcast::Sender<RpcNotification>,
    pending_replies: Arc<Mutex<VecDeque<oneshot::Sender<Value>>>>,
}

/// Keeps one child process alive per agent, reused across turns.
#[derive(Clone, Default)]
pub struct LongLivedRunner {
    children: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<ChildProc>>>>>,
}

impl LongLivedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    async fn child_for(
        &self,
        request: &TurnRequest,
    ) -> Result<Arc<tokio::sync::Mutex<ChildProc>>, RunnerError> {
        if let Some(existing) = self.children.lock().get(&request.agent).cloned() {
            return Ok(existing);
        }

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&request.command)
            .current_dir(&request.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| RunnerError::SpawnFailed(e.to_string()))?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");

        let (notify_tx, _) = broadcast::channel(256);
        let pending_replies = Arc::new(Mutex::new(VecDeque::new()));

        spawn_reader(stdout, notify_tx.clone(), pending_replies.clone());

        let proc = Arc::new(tokio::sync::Mutex::new(ChildProc {
            child,
            stdin,
            notify_tx,
            pending_replies,
        }));
        self.children.lock().insert(request.agent.clone(), proc.clone());
        Ok(proc)
    }

    /// Tears down and forgets the long-lived child for `agent`, forcing a
    /// fresh spawn on the next turn. Used when the protocol desyncs.
    pub fn evict(&self, agent: &str) {
        self.children.lock().remove(agent);
    }
}

fn spawn_reader(
    stdout: tokio::process::ChildStdout,
    notify_tx: broadcast::Sender<RpcNotification>,
    pending_replies: Arc<Mutex<VecDeque<oneshot::Sender<Value>>>>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Ok(value) = serde_json::from_str::<Value>(&line) else {
                        tracing::warn!(line, "unparseable line from turn runner child");
                        continue;
                    };
                    if value.get("method").is_some() {
                        match serde_json::from_value::<RpcNotification>(value) {
                            Ok(notification) => {
                                let _ = notify_tx.send(notification);
                            }
                            Err(e) => tracing::warn!(error = %e, "unrecognized notification shape"),
                        }
                    } else if let Some(sender) = pending_replies.lock().pop_front() {
                        let _ = sender.send(value);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "turn runner child stdout closed with error");
                    break;
                }
            }
        }
    });
}

async fn send_request(proc: &mut ChildProc, request: &RpcRequest) -> Result<(), RunnerError> {
    let mut line = serde_json::to_string(request).map_err(|e| RunnerError::MalformedOutput(e.to_string()))?;
    line.push('\n');
    proc.stdin.write_all(line.as_bytes()).await?;
    Ok(())
}

async fn send_request_await_reply(
    proc: &mut ChildProc,
    request: &RpcRequest,
) -> Result<Value, RunnerError> {
    let (tx, rx) = oneshot::channel();
    proc.pending_replies.lock().push_back(tx);
    send_request(proc, request).await?;
    rx.await
        .map_err(|_| RunnerError::StreamDisconnected("child closed before replying".into()))
}

#[async_trait]
impl TurnRunner for LongLivedRunner {
    async fn run_turn(&self, request: TurnRequest, mut watch: WatchHandle) -> TurnOutcome {
        let proc = match self.child_for(&request).await {
            Ok(proc) => proc,
            Err(e) => return TurnOutcome::Fatal(e),
        };

        let thread_id = {
            let mut guard = proc.lock().await;
            let reply = if let Some(resume) = &request.resume_thread_id {
                send_request_await_reply(
                    &mut guard,
                    &RpcRequest::ThreadResume {
                        thread_id: resume.clone(),
                    },
                )
                .await
            } else {
                send_request_await_reply(&mut guard, &RpcRequest::ThreadStart {}).await
            };
            match reply {
                Ok(value) => match value.get("thread_id").and_then(Value::as_str) {
                    Some(id) => id.to_string(),
                    None => return TurnOutcome::Fatal(RunnerError::MalformedOutput(
                        "thread/start reply missing thread_id".into(),
                    )),
                },
                Err(e) => return TurnOutcome::Fatal(e),
            }
        };

        let mut notifications = proc.lock().await.notify_tx.subscribe();

        {
            let mut guard = proc.lock().await;
            if let Err(e) = send_request(
                &mut guard,
                &RpcRequest::TurnStart {
                    thread_id: thread_id.clone(),
                    input: request.prompt.clone(),
                    cwd: request.cwd.to_string_lossy().into_owned(),
                    sandbox_policy: "workspace-write".to_string(),
                    output_schema: request.output_schema_ref.clone(),
                },
            )
            .await
            {
                return TurnOutcome::Fatal(e);
            }
        }

        let mut turn_id: Option<String> = None;
        loop {
            tokio::select! {
                notification = notifications.recv() => {
                    match notification {
                        Ok(RpcNotification::TurnStarted { turn }) => {
                            turn_id = Some(turn.id);
                        }
                        Ok(RpcNotification::TurnCompleted { turn }) => {
                            return self.finish(&request, thread_id, turn).await;
                        }
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => {
                            return TurnOutcome::Fatal(RunnerError::StreamDisconnected(
                                "notification stream closed".into(),
                            ));
                        }
                    }
                }
                signal = watch.cancelled() => {
                    self.interrupt(&proc, &thread_id, turn_id.as_deref(), request.kill_grace).await;
                    return match signal {
                        WatchSignal::Supersede => TurnOutcome::Superseded { thread_id: Some(thread_id) },
                        _ => TurnOutcome::TimedOut { thread_id: Some(thread_id) },
                    };
                }
                _ = tokio::time::sleep(request.timeout) => {
                    self.interrupt(&proc, &thread_id, turn_id.as_deref(), request.kill_grace).await;
                    return TurnOutcome::TimedOut { thread_id: Some(thread_id) };
                }
            }
        }
    }
}

impl LongLivedRunner {
    async fn interrupt(
        &self,
        proc: &Arc<tokio::sync::Mutex<ChildProc>>,
        thread_id: &str,
        turn_id: Option<&str>,
        kill_grace: std::time::Duration,
    ) {
        let Some(turn_id) = turn_id else {
            return;
        };
        let mut guard = proc.lock().await;
        let _ = send_request(
            &mut guard,
            &RpcRequest::TurnInterrupt {
                thread_id: thread_id.to_string(),
                turn_id: turn_id.to_string(),
            },
        )
        .await;
        drop(guard);
        tokio::time::sleep(kill_grace).await;
    }

    async fn finish(
        &self,
        request: &TurnRequest,
        thread_id: String,
        turn: crate::rpc::TurnCompleted,
    ) -> TurnOutcome {
        if turn.status == TurnStatus::Failed {
            let message = turn.error.unwrap_or_else(|| "turn failed".to_string());
            return TurnOutcome::Fatal(RunnerError::MalformedOutput(message));
        }
        let bytes = match tokio::fs::read(&request.output_path).await {
            Ok(bytes) => bytes,
            Err(e) => return TurnOutcome::Fatal(RunnerError::Io(e)),
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => TurnOutcome::Completed(TurnOutput {
                thread_id,
                output_path: request.output_path.clone(),
                value,
            }),
            Err(e) => TurnOutcome::Fatal(RunnerError::MalformedOutput(e.to_string())),
        }
    }
}
