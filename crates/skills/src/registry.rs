// SPDX-License-Identifier: MIT

//! A typed registry of prompt-assembly capabilities (Design Notes §9),
//! replacing the `$name` ambient-callback tokens the original runbook
//! interpreted as free-form shell directives.

use std::collections::HashMap;

use crate::template;

/// Which leading slot (if any) a skill can fill during selection (§4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkillRole {
    Planning,
    Execution,
    General,
}

/// One named directive the turn runner interprets, rendered into the
/// assembled prompt with `${var}` interpolation.
#[derive(Debug, Clone)]
pub struct Skill {
    pub name: String,
    pub role: SkillRole,
    directive: String,
}

impl Skill {
    pub fn new(name: impl Into<String>, role: SkillRole, directive: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role,
            directive: directive.into(),
        }
    }

    pub fn render(&self, vars: &HashMap<String, String>) -> String {
        template::interpolate(&self.directive, vars)
    }
}

/// The agent-independent set of known skills, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SkillRegistry {
    skills: HashMap<String, Skill>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, skill: Skill) -> &mut Self {
        self.skills.insert(skill.name.clone(), skill);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Skill> {
        self.skills.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.skills.contains_key(name)
    }
}
