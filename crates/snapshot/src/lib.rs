// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hew-snapshot: content-addressed file-tree capture via git plumbing.
//!
//! Snapshots are tree objects written from a scratch index, recorded as
//! timestamped refs under `refs/hew/snapshots/`. Nothing here touches the
//! user's staging area, and no operation panics: every call returns a
//! result struct with `success` and an error string, because "not a git
//! repository" is an expected answer, not a crash.

mod git;
mod snapshot;

pub use snapshot::{
    FileDelta, FileStatus, SnapshotDiff, SnapshotResult, Snapshots, SNAPSHOT_REF_PREFIX,
};
