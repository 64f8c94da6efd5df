// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentbus-observer: the Observer (spec §4.5) — periodically reads an
//! external review source and emits `REVIEW_ACTION_REQUIRED` packets for
//! items the bus hasn't seen yet, under a per-instance cold-start policy.

pub mod config;
pub mod error;
pub mod filter;
pub mod observer;
pub mod source;
pub mod state;

pub use config::ObserverConfig;
pub use error::ObserverError;
pub use filter::{allow_all, BotFilter, KeywordFilter, ReviewFilter};
pub use observer::Observer;
pub use source::{ReviewItem, ReviewSource, ShellReviewSource, StaticReviewSource};
pub use state::{ColdStartMode, ObserverState, ObserverStateStore};
