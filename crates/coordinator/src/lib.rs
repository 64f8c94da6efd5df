// SPDX-License-Identifier: MIT

//! agentbus-coordinator: the Rate Coordinator (spec §4.3) — a global
//! semaphore bounding in-flight turns and a global cooldown record
//! workers wait on before spawning a new turn.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod cooldown;
pub mod semaphore;

pub use cooldown::{CooldownCoordinator, CooldownRecord};
pub use semaphore::{Lease, LeaseRecord, Semaphore};
