// SPDX-License-Identifier: MIT

use super::*;
use std::path::PathBuf;
use yare::parameterized;

#[test]
fn uri_round_trip() {
    let path = Path::new("/home/dev/project/src/main.ts");
    let uri = path_to_uri(path);
    assert_eq!(uri, "file:///home/dev/project/src/main.ts");
    assert_eq!(uri_to_path(&uri), PathBuf::from("/home/dev/project/src/main.ts"));
}

#[test]
fn uri_to_path_passes_through_non_file_uris() {
    assert_eq!(uri_to_path("/plain/path"), PathBuf::from("/plain/path"));
}

#[parameterized(
    typescript = { "src/a.ts", "typescript" },
    tsx = { "src/a.tsx", "typescriptreact" },
    javascript = { "a.mjs", "javascript" },
    python = { "a.py", "python" },
    rust = { "lib.rs", "rust" },
    go = { "main.go", "go" },
    unknown = { "notes.xyz", "plaintext" },
    no_extension = { "Makefile", "plaintext" },
)]
fn language_ids(path: &str, expected: &str) {
    assert_eq!(language_id_for_path(Path::new(path)), expected);
}

#[test]
fn initialize_params_declares_capabilities() {
    let params = initialize_params("file:///proj");
    assert_eq!(params["rootUri"], "file:///proj");

    let text_document = &params["capabilities"]["textDocument"];
    for capability in [
        "synchronization",
        "completion",
        "hover",
        "definition",
        "references",
        "documentSymbol",
        "rename",
        "implementation",
        "callHierarchy",
        "publishDiagnostics",
    ] {
        assert!(
            !text_document[capability].is_null(),
            "missing capability: {capability}"
        );
    }
    assert!(!params["capabilities"]["workspace"]["symbol"].is_null());
}

#[test]
fn position_serializes_with_lsp_field_names() {
    let position = Position::new(3, 7);
    let json = serde_json::to_value(position).unwrap();
    assert_eq!(json, serde_json::json!({"line": 3, "character": 7}));
}

#[test]
fn diagnostic_tolerates_missing_optionals() {
    let json = serde_json::json!({
        "range": {
            "start": {"line": 0, "character": 0},
            "end": {"line": 0, "character": 5}
        },
        "message": "unused variable"
    });
    let diagnostic: Diagnostic = serde_json::from_value(json).unwrap();
    assert_eq!(diagnostic.message, "unused variable");
    assert_eq!(diagnostic.severity, None);
}

#[test]
fn completion_item_reads_insert_text() {
    let json = serde_json::json!({"label": "push", "insertText": "push($0)"});
    let item: CompletionItem = serde_json::from_value(json).unwrap();
    assert_eq!(item.insert_text.as_deref(), Some("push($0)"));
}
