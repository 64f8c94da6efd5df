// SPDX-License-Identifier: MIT

//! Prompt assembly (§4.2.1): deterministic from agent identity, task
//! body, context snapshot, and skill list.

use std::collections::{HashMap, HashSet};

use agentbus_core::{AgentConfig, AgentKind, PacketMeta, SignalKind};

use crate::context::ContextSnapshot;
use crate::registry::{Skill, SkillRegistry, SkillRole};

/// Builds the full prompt text for one turn. Smoke packets
/// (`signals.smoke`) skip skill invocation entirely.
pub fn assemble_prompt(
    agent: &AgentConfig,
    packet: &PacketMeta,
    body: &str,
    registry: &SkillRegistry,
    context: &ContextSnapshot,
    vars: &HashMap<String, String>,
) -> String {
    let mut sections = vec![format!("# Task: {}", packet.title), body.to_string(), context.render()];

    if !packet.signals.smoke {
        for skill in select_skills(agent, packet, registry) {
            sections.push(skill.render(vars));
        }
    }

    sections.join("\n\n")
}

/// The leading-slot skill, then the remainder of the agent's skill list
/// in original order, each name taken at most once.
fn select_skills<'a>(agent: &AgentConfig, packet: &PacketMeta, registry: &'a SkillRegistry) -> Vec<&'a Skill> {
    let mut selected = Vec::new();
    let mut used: HashSet<&str> = HashSet::new();

    let leading_role = match packet.signals.kind {
        SignalKind::PlanRequest => Some(SkillRole::Planning),
        SignalKind::Execute => Some(SkillRole::Execution),
        _ if agent.kind == AgentKind::Autopilot => Some(SkillRole::Execution),
        _ => None,
    };

    if let Some(role) = leading_role {
        if let Some(skill) = agent
            .skills
            .iter()
            .filter_map(|name| registry.get(name))
            .find(|skill| skill.role == role)
        {
            used.insert(skill.name.as_str());
            selected.push(skill);
        }
    }

    for name in &agent.skills {
        if used.contains(name.as_str()) {
            continue;
        }
        if let Some(skill) = registry.get(name) {
            used.insert(skill.name.as_str());
            selected.push(skill);
        }
    }

    selected
}
