// SPDX-License-Identifier: MIT

//! agentbus-store: the Bus Store (spec §4.1) — the on-disk representation
//! of tasks and receipts that every other component is a client of.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod atomic;
pub mod bus_store;
pub mod deliverer;
pub mod packet_file;
pub mod session_pin;
pub mod worker_lock;

pub use bus_store::{AgentStatus, BusStore, OpenedPacket, Store, StatusSummary};
pub use deliverer::{deliver, DeliverOutcome};
pub use packet_file::Packet;
pub use session_pin::{SessionPin, SessionPins};
pub use worker_lock::{WorkerLock, WorkerLockError};
