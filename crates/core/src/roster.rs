// SPDX-License-Identifier: MIT

//! The configured roster of known agents (SPEC_FULL §3 [EXPANDED]).
//!
//! The Deliverer and Bus Store consult the roster to reject delivery to
//! unknown agents (`dependency_missing`), and the Supervisor consults it
//! to look up an agent's skill list and turn-runner command line.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Operator,
    Autopilot,
    Worker,
    Orchestrator,
    Observer,
    Consult,
}

/// Static configuration for one roster entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub kind: AgentKind,
    /// Command line used to spawn this agent's Turn Runner. Absent for
    /// agents that never run turns (e.g. a pure sink like `operator`).
    #[serde(default)]
    pub command: Option<String>,
    /// Ordered skill names, consulted during prompt assembly (§4.2.1).
    #[serde(default)]
    pub skills: Vec<String>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            command: None,
            skills: Vec::new(),
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_skills(mut self, skills: Vec<String>) -> Self {
        self.skills = skills;
        self
    }
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    agents: HashMap<String, AgentConfig>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, config: AgentConfig) -> &mut Self {
        self.agents.insert(config.name.clone(), config);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn require(&self, name: &str) -> Result<&AgentConfig, RosterError> {
        self.get(name)
            .ok_or_else(|| RosterError::UnknownAgent(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(|s| s.as_str())
    }

    pub fn by_kind(&self, kind: AgentKind) -> impl Iterator<Item = &AgentConfig> {
        self.agents.values().filter(move |a| a.kind == kind)
    }
}
