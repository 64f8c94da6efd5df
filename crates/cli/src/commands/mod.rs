// SPDX-License-Identifier: MIT

//! CLI command implementations

pub mod coordinator;
pub mod enqueue;
pub mod inbox;
pub mod receipt;
pub mod status;
pub mod worker;
