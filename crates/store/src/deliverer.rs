// SPDX-License-Identifier: MIT

//! The Deliverer (spec §4.6): a thin roster-aware wrapper over
//! `BusStore::deliver` used by every component that emits a packet.

use std::path::PathBuf;

use agentbus_core::{BusError, Clock, IdGen, PacketMeta};

use crate::bus_store::BusStore;

#[derive(Debug, Clone)]
pub enum DeliverOutcome {
    Delivered { agent: String, path: PathBuf },
    Rejected { agent: String, reason: String },
}

/// Delivers `meta`/`body` to every recipient in `meta.to`, rejecting
/// recipients absent from the roster instead of failing the whole call.
/// Partial success across recipients is the norm, not an error case.
pub fn deliver<G: IdGen, C: Clock>(
    store: &BusStore<G, C>,
    meta: &PacketMeta,
    body: &str,
) -> Vec<DeliverOutcome> {
    meta.to
        .iter()
        .map(|agent| deliver_one(store, agent, meta, body))
        .collect()
}

fn deliver_one<G: IdGen, C: Clock>(
    store: &BusStore<G, C>,
    agent: &str,
    meta: &PacketMeta,
    body: &str,
) -> DeliverOutcome {
    if !store.roster().contains(agent) {
        return DeliverOutcome::Rejected {
            agent: agent.to_string(),
            reason: BusError::DependencyMissing(agent.to_string()).to_string(),
        };
    }
    let mut single = meta.clone();
    single.to = vec![agent.to_string()];
    match store.deliver(&single, body) {
        Ok(mut paths) => DeliverOutcome::Delivered {
            agent: agent.to_string(),
            path: paths.remove(0),
        },
        Err(e) => DeliverOutcome::Rejected {
            agent: agent.to_string(),
            reason: e.to_string(),
        },
    }
}
