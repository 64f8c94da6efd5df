// SPDX-License-Identifier: MIT

//! The turn output contract (§4.2.4, §6.1). The Supervisor only
//! interprets `outcome`, `note`, `commitSha`, `followUps`, and treats
//! `receiptExtra` as opaque passthrough.

use agentbus_core::{Outcome, SignalKind};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowUpSignals {
    pub kind: SignalKind,
    #[serde(default)]
    pub phase: String,
}

/// A follow-up packet requested by the turn's output (§4.2.3).
#[derive(Debug, Clone, Deserialize)]
pub struct FollowUpSpec {
    #[serde(deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub signals: FollowUpSignals,
    #[serde(default, rename = "rootId")]
    pub root_id: Option<String>,
    #[serde(default, rename = "parentId")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TurnOutputPayload {
    pub outcome: Outcome,
    #[serde(default)]
    pub note: String,
    #[serde(default, rename = "commitSha")]
    pub commit_sha: Option<String>,
    #[serde(default, rename = "followUps")]
    pub follow_ups: Vec<FollowUpSpec>,
    #[serde(default, rename = "receiptExtra")]
    pub receipt_extra: Value,
}

pub fn parse_turn_output(value: &Value) -> Result<TurnOutputPayload, serde_json::Error> {
    serde_json::from_value(value.clone())
}
