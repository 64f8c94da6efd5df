// SPDX-License-Identifier: MIT

//! The Turn Runner abstract contract (spec §4.2.2, §6.3): one `runTurn`
//! shape realized by a one-shot child process and a long-lived JSON-RPC
//! child. The Supervisor treats both identically.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("malformed output: {0}")]
    MalformedOutput(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("rate limited, retry after {retry_after:?}: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },
    #[error("stream disconnected: {0}")]
    StreamDisconnected(String),
}

/// What the Supervisor is asking the in-flight turn to do, observed by
/// the runner's internal race against completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchSignal {
    Running,
    Supersede,
    Timeout,
}

/// The Supervisor side of the watch channel: flips the signal and the
/// runner's `run_turn` call races its completion future against it.
#[derive(Clone)]
pub struct WatchHandle {
    rx: watch::Receiver<WatchSignal>,
}

pub struct WatchController {
    tx: watch::Sender<WatchSignal>,
}

pub fn watch_channel() -> (WatchController, WatchHandle) {
    let (tx, rx) = watch::channel(WatchSignal::Running);
    (WatchController { tx }, WatchHandle { rx })
}

impl WatchController {
    pub fn supersede(&self) {
        let _ = self.tx.send(WatchSignal::Supersede);
    }

    pub fn timeout(&self) {
        let _ = self.tx.send(WatchSignal::Timeout);
    }
}

impl WatchHandle {
    /// Waits until a non-`Running` signal arrives, returning it.
    pub async fn cancelled(&mut self) -> WatchSignal {
        loop {
            if *self.rx.borrow() != WatchSignal::Running {
                return *self.rx.borrow();
            }
            if self.rx.changed().await.is_err() {
                return WatchSignal::Running;
            }
        }
    }

    pub fn current(&self) -> WatchSignal {
        *self.rx.borrow()
    }
}

/// One prompt to run, with everything the runner needs to realize it
/// against either protocol.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub agent: String,
    /// The agent's configured command line (roster `AgentConfig::command`).
    pub command: String,
    pub prompt: String,
    pub output_path: PathBuf,
    pub output_schema_ref: String,
    pub cwd: PathBuf,
    pub resume_thread_id: Option<String>,
    pub timeout: Duration,
    pub kill_grace: Duration,
}

#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub thread_id: String,
    pub output_path: PathBuf,
    pub value: serde_json::Value,
}

/// The sum-typed turn result Design Notes §9 calls for, replacing
/// exception-as-control-flow for supersede/timeout/transient failure.
#[derive(Debug)]
pub enum TurnOutcome {
    Completed(TurnOutput),
    Superseded { thread_id: Option<String> },
    TimedOut { thread_id: Option<String> },
    Transient(RunnerError),
    Fatal(RunnerError),
}

/// Abstract "execute one prompt" contract (spec §4.2.2). Implementors
/// realize either the one-shot or long-lived child process protocol.
#[async_trait]
pub trait TurnRunner: Clone + Send + Sync + 'static {
    async fn run_turn(&self, request: TurnRequest, watch: WatchHandle) -> TurnOutcome;
}
