// SPDX-License-Identifier: MIT

//! Session timeline events.
//!
//! The persisted message/part/tool-call rows are projected into this sum
//! type for rendering. Tool-call variants carry the extra correlation
//! fields; everything else is text plus a timestamp.

use crate::id::{MessageId, ToolCallId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEvent {
    User {
        message_id: MessageId,
        text: String,
        at_ms: u64,
    },
    Assistant {
        message_id: MessageId,
        text: String,
        at_ms: u64,
    },
    Reasoning {
        message_id: MessageId,
        text: String,
        at_ms: u64,
    },
    ToolCall {
        message_id: MessageId,
        call_id: ToolCallId,
        tool: String,
        arguments: serde_json::Value,
        at_ms: u64,
    },
    ToolResult {
        message_id: MessageId,
        call_id: ToolCallId,
        tool: String,
        output: String,
        is_error: bool,
        at_ms: u64,
    },
    Status {
        text: String,
        at_ms: u64,
    },
}

impl TimelineEvent {
    pub fn at_ms(&self) -> u64 {
        match self {
            Self::User { at_ms, .. }
            | Self::Assistant { at_ms, .. }
            | Self::Reasoning { at_ms, .. }
            | Self::ToolCall { at_ms, .. }
            | Self::ToolResult { at_ms, .. }
            | Self::Status { at_ms, .. } => *at_ms,
        }
    }
}

#[cfg(test)]
#[path = "timeline_tests.rs"]
mod tests;
