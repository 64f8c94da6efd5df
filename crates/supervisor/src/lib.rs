// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentbus-supervisor: the Worker Supervisor (spec §4.2) — one event
//! loop per roster agent, claiming inbox packets, spawning turns through
//! the Turn Runner, and closing receipts per the failure-semantics table
//! at §4.2.4.

pub mod config;
pub mod context_builder;
pub mod error;
pub mod events;
pub mod followups;
pub mod output;
pub mod supervisor;
pub mod throttle;

pub use config::SupervisorConfig;
pub use error::SupervisorError;
pub use events::SupervisorEvent;
pub use followups::{dispatch_follow_ups, MAX_FOLLOW_UPS};
pub use output::{parse_turn_output, FollowUpSignals, FollowUpSpec, TurnOutputPayload};
pub use supervisor::WorkerSupervisor;
pub use throttle::{StatusThrottle, DEFAULT_WINDOW};
