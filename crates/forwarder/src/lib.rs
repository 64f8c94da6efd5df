// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentbus-forwarder: the Orchestrator Forwarder (spec §4.4) — drains
//! the orchestrator's inbox, turning closed-task and review-action
//! packets into digests for autopilot, with loop-avoidance and
//! review-action coalescing.

pub mod config;
pub mod digest;
pub mod error;
pub mod loop_;

pub use config::{DigestMode, ForwarderConfig};
pub use digest::{build_digest, review_required};
pub use error::ForwarderError;
pub use loop_::ForwarderLoop;
