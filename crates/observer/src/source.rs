// SPDX-License-Identifier: MIT

//! The pluggable review source (spec §4.5): whatever polls an external
//! review surface (a PR host, an issue tracker, ...) for open items.

use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::error::ObserverError;

/// One open item on a review surface, already normalized to the fields
/// the filters and digest packets need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub id: String,
    pub author: String,
    pub is_bot: bool,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
    pub created_at_ms: u64,
}

/// A source of open review items. The production implementation shells
/// out to an operator-configured command (a thin wrapper around
/// whatever review-host CLI the deployment already has); tests supply a
/// canned list instead.
pub trait ReviewSource: Send + Sync {
    fn name(&self) -> &str;
    fn poll(&self) -> Result<Vec<ReviewItem>, ObserverError>;
}

/// Shells out to `command`, expecting a JSON array of [`ReviewItem`] on
/// stdout. Mirrors the Turn Runner's "one command line, JSON in, JSON
/// out" contract so operators can point it at any review host adapter.
pub struct ShellReviewSource {
    name: String,
    command: String,
}

impl ShellReviewSource {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

impl ReviewSource for ShellReviewSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&self) -> Result<Vec<ReviewItem>, ObserverError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ObserverError::Source(self.name.clone(), e.to_string()))?;
        if !output.status.success() {
            return Err(ObserverError::Source(
                self.name.clone(),
                format!("exited with {}", output.status),
            ));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| ObserverError::Source(self.name.clone(), e.to_string()))
    }
}

/// In-memory review source for tests.
pub struct StaticReviewSource {
    name: String,
    items: Vec<ReviewItem>,
}

impl StaticReviewSource {
    pub fn new(name: impl Into<String>, items: Vec<ReviewItem>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }
}

impl ReviewSource for StaticReviewSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&self) -> Result<Vec<ReviewItem>, ObserverError> {
        Ok(self.items.clone())
    }
}
