// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hew-patch: unified-diff parsing, application, and synthesis.
//!
//! The parser and splice logic are pure; only [`apply`] touches the
//! filesystem. Application trusts the diff: there is no three-way merge
//! and no rollback of files written earlier in a multi-file patch. Callers
//! that need atomicity pair this crate with the snapshot layer.

mod apply;
mod error;
mod parse;
mod synth;

pub use apply::{apply, splice_hunks, ApplyReport, AppliedFile};
pub use error::PatchError;
pub use parse::{parse, FilePatch, Hunk, HunkLine, Patch};
pub use synth::synthesize;
