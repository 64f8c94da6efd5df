// SPDX-License-Identifier: MIT

//! Wire types for the long-lived Turn Runner's line-delimited JSON-RPC
//! protocol (spec §6.3).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum RpcRequest {
    #[serde(rename = "thread/start")]
    ThreadStart {},
    #[serde(rename = "thread/resume")]
    ThreadResume { thread_id: String },
    #[serde(rename = "turn/start")]
    TurnStart {
        thread_id: String,
        input: String,
        cwd: String,
        sandbox_policy: String,
        output_schema: String,
    },
    #[serde(rename = "turn/interrupt")]
    TurnInterrupt { thread_id: String, turn_id: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RpcNotification {
    #[serde(rename = "turn/started")]
    TurnStarted { turn: TurnRef },
    #[serde(rename = "turn/completed")]
    TurnCompleted { turn: TurnCompleted },
    #[serde(rename = "item/agentMessage/delta")]
    AgentMessageDelta { delta: String },
    #[serde(rename = "item/completed")]
    ItemCompleted { item: Item },
    #[serde(rename = "item/commandExecution/outputDelta")]
    CommandOutputDelta { delta: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TurnRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TurnCompleted {
    pub id: String,
    pub status: TurnStatus,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadStartResult {
    pub thread_id: String,
}

/// One decoded line from the child's stdout: either a notification, or a
/// response to a request we issued (keyed loosely — the real protocol
/// would carry a request id; this implementation matches by shape, which
/// is sufficient since requests and their responses are never pipelined).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RpcLine {
    Notification(RpcNotification),
    ThreadResult(ThreadStartResult),
    Raw(Value),
}
