// SPDX-License-Identifier: MIT

use super::*;
use yare::parameterized;

#[parameterized(
    validation = { EngineError::validation("bad path"), "VALIDATION" },
    missing = { EngineError::missing("no such file"), "RESOURCE_MISSING" },
    protocol = { EngineError::Protocol("timeout".into()), "PROTOCOL" },
    transport = { EngineError::Transport("pipe closed".into()), "TRANSPORT" },
    persistence = { EngineError::Persistence("disk full".into()), "PERSISTENCE" },
    cancelled = { EngineError::Cancelled, "CANCELLED" },
)]
fn codes_are_stable(err: EngineError, code: &str) {
    assert_eq!(err.code(), code);
}

#[test]
fn tool_json_carries_error_flag() {
    let err = EngineError::validation("operation must be one of hover, definition");
    let json = err.to_tool_json();
    assert_eq!(json["error"], true);
    assert_eq!(json["code"], "VALIDATION");
    assert!(json["message"].as_str().unwrap().contains("operation"));
    assert!(json.get("hint").is_none());
}

#[test]
fn tool_json_includes_hint_when_present() {
    let err = EngineError::missing_with_hint(
        "no snapshots available",
        "initialise a git repository first",
    );
    let json = err.to_tool_json();
    assert_eq!(json["code"], "RESOURCE_MISSING");
    assert_eq!(json["hint"], "initialise a git repository first");
}

#[test]
fn display_does_not_prefix_resource_missing() {
    let err = EngineError::missing("file not found: /tmp/x");
    assert_eq!(err.to_string(), "file not found: /tmp/x");
}
