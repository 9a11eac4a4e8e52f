// SPDX-License-Identifier: MIT

use super::*;
use crate::id::{MessageId, ToolCallId};

#[test]
fn events_tag_their_kind() {
    let event = TimelineEvent::User {
        message_id: MessageId::from_string("msg-1"),
        text: "fix the bug".into(),
        at_ms: 1000,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["kind"], "user");
    assert_eq!(json["text"], "fix the bug");
}

#[test]
fn tool_call_round_trips_with_arguments() {
    let event = TimelineEvent::ToolCall {
        message_id: MessageId::from_string("msg-2"),
        call_id: ToolCallId::from_string("tcl-7"),
        tool: "apply_patch".into(),
        arguments: serde_json::json!({"patch": "--- a/x\n+++ b/x\n"}),
        at_ms: 2000,
    };
    let json = serde_json::to_string(&event).unwrap();
    let back: TimelineEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn at_ms_is_uniform_across_variants() {
    let status = TimelineEvent::Status { text: "compacting".into(), at_ms: 5 };
    assert_eq!(status.at_ms(), 5);
    let result = TimelineEvent::ToolResult {
        message_id: MessageId::from_string("msg-3"),
        call_id: ToolCallId::from_string("tcl-9"),
        tool: "bash".into(),
        output: "ok".into(),
        is_error: false,
        at_ms: 9,
    };
    assert_eq!(result.at_ms(), 9);
}
