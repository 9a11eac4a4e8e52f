// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("patch contains no file sections")]
    Empty,

    #[error("file section for `{path}` declares no hunks")]
    NoHunks { path: String },

    #[error("malformed file header at line {line}: {text}")]
    BadFileHeader { line: usize, text: String },

    #[error("malformed hunk header at line {line}: {text}")]
    BadHunkHeader { line: usize, text: String },

    #[error("hunk @@ -{old_start},{old_count} @@ does not fit `{path}` ({len} lines)")]
    HunkOutOfBounds {
        path: PathBuf,
        old_start: usize,
        old_count: usize,
        len: usize,
    },

    #[error("failed to {action} `{path}`: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
