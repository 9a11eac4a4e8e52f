// SPDX-License-Identifier: MIT

//! Tool invocation context.
//!
//! Every tool receives the session it is running for, the project
//! directory it may touch, and a cancellation token wired to the parent
//! task. There are no module-level singletons; anything else a tool needs
//! is threaded through the engine explicitly.

use crate::error::{EngineError, EngineResult};
use crate::id::SessionId;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ToolContext {
    pub session_id: SessionId,
    pub project_dir: PathBuf,
    pub cancel: CancellationToken,
}

impl ToolContext {
    pub fn new(session_id: SessionId, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            session_id,
            project_dir: project_dir.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fail fast if the parent task has already cancelled us.
    pub fn check_cancelled(&self) -> EngineResult<()> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }

    /// Validate that a tool-supplied path is absolute.
    pub fn require_absolute(path: &Path) -> EngineResult<&Path> {
        if path.is_absolute() {
            Ok(path)
        } else {
            Err(EngineError::validation(format!(
                "path must be absolute: {}",
                path.display()
            )))
        }
    }

    /// Resolve a possibly-relative tool path against the project directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
