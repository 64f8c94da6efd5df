// SPDX-License-Identifier: MIT

//! Follow-up dispatch (§4.2.3): up to `MAX_FOLLOW_UPS` packets per turn,
//! with a loop breaker rejecting self-targeting follow-ups. Errors here
//! never block close; they downgrade the outcome instead (§4.2.4).

use agentbus_core::{Clock, IdGen, PacketMeta, Priority, Signals};
use agentbus_store::BusStore;

use crate::output::FollowUpSpec;

pub const MAX_FOLLOW_UPS: usize = 5;

/// Dispatches `follow_ups`, returning how many were delivered and a list
/// of human-readable errors suitable for `receiptExtra.followUpDispatchErrors`.
pub fn dispatch_follow_ups<G: IdGen, C: Clock>(
    store: &BusStore<G, C>,
    dispatching_agent: &str,
    current: &PacketMeta,
    follow_ups: &[FollowUpSpec],
) -> (usize, Vec<String>) {
    let mut dispatched = 0;
    let mut errors = Vec::new();

    for spec in follow_ups.iter().take(MAX_FOLLOW_UPS) {
        match build_packet(store, dispatching_agent, current, spec) {
            Ok(meta) => match store.deliver(&meta, &spec.body) {
                Ok(_) => dispatched += 1,
                Err(e) => errors.push(format!("{}: delivery failed: {e}", spec.title)),
            },
            Err(reason) => errors.push(reason),
        }
    }

    if follow_ups.len() > MAX_FOLLOW_UPS {
        errors.push(format!(
            "dropped {} follow-up(s) beyond the limit of {MAX_FOLLOW_UPS}",
            follow_ups.len() - MAX_FOLLOW_UPS
        ));
    }

    (dispatched, errors)
}

fn build_packet<G: IdGen, C: Clock>(
    store: &BusStore<G, C>,
    dispatching_agent: &str,
    current: &PacketMeta,
    spec: &FollowUpSpec,
) -> Result<PacketMeta, String> {
    if spec.to.is_empty() {
        return Err("follow-up has empty `to`".to_string());
    }
    if spec.to.iter().any(|target| target == dispatching_agent) {
        return Err(format!(
            "{}: follow-up rejected, targets the dispatching agent itself",
            spec.title
        ));
    }
    if spec.title.is_empty() {
        return Err("follow-up has empty title".to_string());
    }
    if spec.body.is_empty() {
        return Err(format!("{}: follow-up has empty body", spec.title));
    }
    if spec.signals.phase.is_empty() {
        return Err(format!("{}: follow-up signals missing phase", spec.title));
    }

    let root_id = spec
        .root_id
        .clone()
        .or_else(|| current.signals.root_id.clone())
        .unwrap_or_else(|| current.id.to_string());
    let parent_id = spec.parent_id.clone().unwrap_or_else(|| current.id.to_string());

    let mut signals = Signals::new(spec.signals.kind).with_root_id(root_id).with_parent_id(parent_id);
    signals.phase = Some(spec.signals.phase.clone());

    Ok(PacketMeta {
        id: store.next_id(),
        to: spec.to.clone(),
        from: dispatching_agent.to_string(),
        priority: Priority::P2,
        title: spec.title.clone(),
        signals,
        references: Default::default(),
    })
}
