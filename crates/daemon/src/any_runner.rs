// SPDX-License-Identifier: MIT

//! Selects the turn runner engine at startup (§6.2 `turn_runner_engine`).
//! `WorkerSupervisor<R: TurnRunner>` requires `R: Clone`, which rules out
//! `Box<dyn TurnRunner>`; this enum delegates instead, the same shape the
//! skills registry uses for a typed set of capabilities.

use agentbus_runner::{LongLivedRunner, OneShotRunner, TurnOutcome, TurnRequest, TurnRunner, WatchHandle};
use async_trait::async_trait;

use crate::config::TurnEngine;

#[derive(Clone)]
pub enum AnyRunner {
    OneShot(OneShotRunner),
    LongLived(LongLivedRunner),
}

impl AnyRunner {
    pub fn for_engine(engine: TurnEngine) -> Self {
        match engine {
            TurnEngine::OneShot => Self::OneShot(OneShotRunner::new()),
            TurnEngine::LongLived => Self::LongLived(LongLivedRunner::new()),
        }
    }
}

#[async_trait]
impl TurnRunner for AnyRunner {
    async fn run_turn(&self, request: TurnRequest, watch: WatchHandle) -> TurnOutcome {
        match self {
            Self::OneShot(runner) => runner.run_turn(request, watch).await,
            Self::LongLived(runner) => runner.run_turn(request, watch).await,
        }
    }
}
