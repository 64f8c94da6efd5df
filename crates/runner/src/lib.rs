// SPDX-License-Identifier: MIT

//! agentbus-runner: the Turn Runner (spec §4.2.2, §6.3) — the abstract
//! "execute one prompt" contract realized by a one-shot child process and
//! a long-lived JSON-RPC child, treated identically by the Supervisor.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod contract;
pub mod long_lived;
pub mod one_shot;
pub mod rpc;

pub use contract::{
    watch_channel, RunnerError, TurnOutcome, TurnOutput, TurnRequest, TurnRunner, WatchController,
    WatchHandle, WatchSignal,
};
pub use long_lived::LongLivedRunner;
pub use one_shot::OneShotRunner;
