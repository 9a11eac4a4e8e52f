// SPDX-License-Identifier: MIT

//! LSP wire types and helpers.
//!
//! Only the slices of the protocol this engine consumes are modelled;
//! everything else rides through as raw JSON. Deserialization is lenient:
//! unknown fields are ignored and optional fields default, because
//! servers disagree about which extras they send.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Zero-indexed (line, character) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

/// Severity follows the LSP numbering: 1 error, 2 warning, 3 info, 4 hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionItem {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, rename = "insertText", skip_serializing_if = "Option::is_none")]
    pub insert_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSymbol {
    pub name: String,
    #[serde(default)]
    pub kind: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocumentSymbol>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingCall {
    pub from: CallHierarchyItem,
    #[serde(rename = "fromRanges", default)]
    pub from_ranges: Vec<Range>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingCall {
    pub to: CallHierarchyItem,
    #[serde(rename = "fromRanges", default)]
    pub from_ranges: Vec<Range>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallHierarchyItem {
    pub name: String,
    #[serde(default)]
    pub kind: u32,
    pub uri: String,
    pub range: Range,
    #[serde(rename = "selectionRange")]
    pub selection_range: Range,
}

/// `file://` URI from an absolute path.
pub fn path_to_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Path from a `file://` URI; non-file URIs come back unchanged as paths.
pub fn uri_to_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

/// LSP language identifier for a file, by extension.
pub fn language_id_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "py" | "pyi" => "python",
        "rs" => "rust",
        "go" => "go",
        "json" => "json",
        "md" => "markdown",
        _ => "plaintext",
    }
}

/// The capability envelope sent with `initialize`.
///
/// Declares exactly what the client layer implements: document sync,
/// completion, hover, definition, references, symbols, rename,
/// implementation, call hierarchy, and published diagnostics.
pub fn initialize_params(root_uri: &str) -> serde_json::Value {
    serde_json::json!({
        "processId": std::process::id(),
        "rootUri": root_uri,
        "capabilities": {
            "textDocument": {
                "synchronization": {
                    "didSave": true,
                    "dynamicRegistration": false
                },
                "completion": {
                    "completionItem": {
                        "snippetSupport": false,
                        "documentationFormat": ["markdown", "plaintext"]
                    }
                },
                "hover": {
                    "contentFormat": ["markdown", "plaintext"]
                },
                "definition": { "linkSupport": true },
                "references": {},
                "documentSymbol": { "hierarchicalDocumentSymbolSupport": true },
                "rename": { "prepareSupport": true },
                "implementation": { "linkSupport": true },
                "callHierarchy": {},
                "publishDiagnostics": { "relatedInformation": true }
            },
            "workspace": {
                "symbol": {},
                "workspaceFolders": false
            }
        },
        "workspaceFolders": null
    })
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
