// SPDX-License-Identifier: MIT

//! Loads the roster (§6.2 `roster_path`) from a TOML file of
//! `[agents.<name>]` tables.

use std::path::Path;

use agentbus_core::{AgentConfig, Roster};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RosterFileError {
    #[error("io error reading {0}: {1}")]
    Io(std::path::PathBuf, std::io::Error),
    #[error("invalid TOML in {0}: {1}")]
    Toml(std::path::PathBuf, toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct RosterFile {
    agents: std::collections::HashMap<String, AgentEntry>,
}

#[derive(Debug, Deserialize)]
struct AgentEntry {
    kind: agentbus_core::AgentKind,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    skills: Vec<String>,
}

pub fn load_roster(path: &Path) -> Result<Roster, RosterFileError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| RosterFileError::Io(path.to_path_buf(), e))?;
    let parsed: RosterFile =
        toml::from_str(&contents).map_err(|e| RosterFileError::Toml(path.to_path_buf(), e))?;

    let mut roster = Roster::new();
    for (name, entry) in parsed.agents {
        let mut config = AgentConfig::new(name, entry.kind).with_skills(entry.skills);
        if let Some(command) = entry.command {
            config = config.with_command(command);
        }
        roster.insert(config);
    }
    Ok(roster)
}
