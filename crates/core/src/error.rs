// SPDX-License-Identifier: MIT

//! Engine-wide error taxonomy, ordered by severity.
//!
//! Every subsystem converts its own error type into [`EngineError`] at the
//! tool boundary so the dispatcher can report failures uniformly. The
//! variants deliberately mirror how callers are expected to react:
//! `Validation` means retry with corrected input, `ResourceMissing` means
//! the target does not exist, `Protocol` means the request failed but the
//! session survives, `Transport` means the peer is gone, `Persistence`
//! means a database write was lost, `Cancelled` means the parent task gave
//! up waiting.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid arguments to a tool or primitive (non-absolute path,
    /// missing required field, unrecognised operation).
    #[error("invalid arguments: {0}")]
    Validation(String),

    /// File not found, no LSP server for the file type, snapshots
    /// unavailable. Carries an actionable hint where one exists.
    #[error("{message}")]
    ResourceMissing {
        message: String,
        hint: Option<String>,
    },

    /// Request-level failure: LSP timeout, server-side error response,
    /// HTTP non-2xx from the embedding or vector endpoints.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Subprocess exit, broken pipe, connection refused.
    #[error("transport error: {0}")]
    Transport(String),

    /// Database write failure. Never swallowed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The parent task signalled cancellation.
    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn missing(message: impl Into<String>) -> Self {
        Self::ResourceMissing { message: message.into(), hint: None }
    }

    pub fn missing_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::ResourceMissing {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// Machine-readable code for structured tool failures.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::ResourceMissing { .. } => "RESOURCE_MISSING",
            Self::Protocol(_) => "PROTOCOL",
            Self::Transport(_) => "TRANSPORT",
            Self::Persistence(_) => "PERSISTENCE",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Render as the JSON object leaf tools return on application-level
    /// failure: `{"error": true, "code": ..., "message": ..., "hint"?: ...}`.
    pub fn to_tool_json(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "error": true,
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Self::ResourceMissing { hint: Some(hint), .. } = self {
            obj["hint"] = serde_json::Value::String(hint.clone());
        }
        obj
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
