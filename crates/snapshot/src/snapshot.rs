// SPDX-License-Identifier: MIT

//! Snapshot capture and restore.

use crate::git::{git_dir, is_work_tree, run_git, run_git_ok};
use hew_core::Clock;
use std::path::{Path, PathBuf};

/// Refs namespace for snapshot trees. Ref names are
/// `<epoch-ms>-<short-hash>` so retention can be judged from the name
/// alone.
pub const SNAPSHOT_REF_PREFIX: &str = "refs/hew/snapshots";

const NOT_A_REPO: &str = "project is not a git repository";

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotResult {
    pub success: bool,
    pub hash: Option<String>,
    pub error: Option<String>,
}

impl SnapshotResult {
    fn ok(hash: impl Into<String>) -> Self {
        Self { success: true, hash: Some(hash.into()), error: None }
    }

    fn done() -> Self {
        Self { success: true, hash: None, error: None }
    }

    fn fail(error: impl Into<String>) -> Self {
        Self { success: false, hash: None, error: Some(error.into()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileDelta {
    pub path: String,
    pub additions: u64,
    pub deletions: u64,
    pub status: FileStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDiff {
    pub success: bool,
    pub files: Vec<FileDelta>,
    pub patch: String,
    pub error: Option<String>,
}

impl SnapshotDiff {
    fn fail(error: impl Into<String>) -> Self {
        Self { success: false, files: Vec::new(), patch: String::new(), error: Some(error.into()) }
    }
}

/// Snapshot operations over one project directory.
#[derive(Debug, Clone)]
pub struct Snapshots<C: Clock> {
    project_dir: PathBuf,
    clock: C,
}

impl<C: Clock> Snapshots<C> {
    pub fn new(project_dir: impl Into<PathBuf>, clock: C) -> Self {
        Self { project_dir: project_dir.into(), clock }
    }

    /// Capture the working tree as a tree object and record a timestamped
    /// ref pointing at it. Returns the tree hash.
    ///
    /// Staging happens in a scratch index so the user's staging area is
    /// untouched.
    pub async fn track(&self, message: Option<&str>) -> SnapshotResult {
        if !is_work_tree(&self.project_dir).await {
            return SnapshotResult::fail(NOT_A_REPO);
        }

        let scratch = match self.scratch_index().await {
            Ok(path) => path,
            Err(err) => return SnapshotResult::fail(err),
        };
        let index_env = scratch.to_string_lossy().into_owned();
        let env: [(&str, &str); 1] = [("GIT_INDEX_FILE", index_env.as_str())];

        let result = async {
            run_git_ok(&self.project_dir, &env, &["add", "-A", "."]).await?;
            let tree = run_git_ok(&self.project_dir, &env, &["write-tree"]).await?;
            let hash = tree.trim().to_string();

            let ref_name = format!(
                "{}/{}-{}",
                SNAPSHOT_REF_PREFIX,
                self.clock.epoch_ms(),
                &hash[..12.min(hash.len())]
            );
            let reflog_msg = message.unwrap_or("snapshot");
            run_git_ok(
                &self.project_dir,
                &[],
                &["update-ref", "-m", reflog_msg, &ref_name, &hash],
            )
            .await?;
            tracing::debug!(hash = %hash, ref_name = %ref_name, "tracked snapshot");
            Ok::<String, String>(hash)
        }
        .await;

        let _ = tokio::fs::remove_file(&scratch).await;

        match result {
            Ok(hash) => SnapshotResult::ok(hash),
            Err(err) => SnapshotResult::fail(err),
        }
    }

    /// Per-file summary plus unified patch of the working tree relative to
    /// a snapshot tree.
    pub async fn diff(&self, hash: &str) -> SnapshotDiff {
        if !is_work_tree(&self.project_dir).await {
            return SnapshotDiff::fail(NOT_A_REPO);
        }

        let numstat = match run_git_ok(&self.project_dir, &[], &["diff", "--numstat", hash]).await {
            Ok(out) => out,
            Err(err) => return SnapshotDiff::fail(err),
        };
        let name_status =
            match run_git_ok(&self.project_dir, &[], &["diff", "--name-status", hash]).await {
                Ok(out) => out,
                Err(err) => return SnapshotDiff::fail(err),
            };
        let patch = match run_git_ok(&self.project_dir, &[], &["diff", hash]).await {
            Ok(out) => out,
            Err(err) => return SnapshotDiff::fail(err),
        };

        let mut files = Vec::new();
        for line in numstat.lines() {
            let mut parts = line.split('\t');
            let additions = parts.next().and_then(|n| n.parse().ok()).unwrap_or(0);
            let deletions = parts.next().and_then(|n| n.parse().ok()).unwrap_or(0);
            let path = match parts.next() {
                Some(path) => path.to_string(),
                None => continue,
            };
            let status = status_for(&name_status, &path);
            files.push(FileDelta { path, additions, deletions, status });
        }

        SnapshotDiff { success: true, files, patch, error: None }
    }

    /// Overwrite the working tree with a snapshot: read the tree into a
    /// scratch index, then check every entry out.
    pub async fn restore(&self, hash: &str) -> SnapshotResult {
        if !is_work_tree(&self.project_dir).await {
            return SnapshotResult::fail(NOT_A_REPO);
        }

        let scratch = match self.scratch_index().await {
            Ok(path) => path,
            Err(err) => return SnapshotResult::fail(err),
        };
        let index_env = scratch.to_string_lossy().into_owned();
        let env: [(&str, &str); 1] = [("GIT_INDEX_FILE", index_env.as_str())];

        let result = async {
            run_git_ok(&self.project_dir, &env, &["read-tree", hash]).await?;
            run_git_ok(&self.project_dir, &env, &["checkout-index", "-a", "-f"]).await?;
            Ok::<(), String>(())
        }
        .await;

        let _ = tokio::fs::remove_file(&scratch).await;

        match result {
            Ok(()) => {
                tracing::info!(hash = %hash, "restored snapshot");
                SnapshotResult::ok(hash)
            }
            Err(err) => SnapshotResult::fail(err),
        }
    }

    /// Targeted checkout of individual paths from a snapshot.
    pub async fn revert_files(&self, hash: &str, files: &[&str]) -> SnapshotResult {
        if !is_work_tree(&self.project_dir).await {
            return SnapshotResult::fail(NOT_A_REPO);
        }

        for file in files {
            if let Err(err) =
                run_git_ok(&self.project_dir, &[], &["checkout", hash, "--", file]).await
            {
                return SnapshotResult::fail(format!("revert of `{file}` failed: {err}"));
            }
        }
        SnapshotResult::ok(hash)
    }

    /// Drop snapshot refs whose timestamp is older than `retention_ms`.
    pub async fn cleanup(&self, retention_ms: u64) -> SnapshotResult {
        if !is_work_tree(&self.project_dir).await {
            return SnapshotResult::fail(NOT_A_REPO);
        }

        let refs = match run_git(
            &self.project_dir,
            &[],
            &["for-each-ref", "--format=%(refname)", SNAPSHOT_REF_PREFIX],
        )
        .await
        {
            Ok(out) if out.status_ok => out.stdout,
            Ok(out) => return SnapshotResult::fail(out.stderr.trim().to_string()),
            Err(err) => return SnapshotResult::fail(err),
        };

        let now = self.clock.epoch_ms();
        let mut removed = 0u64;
        for ref_name in refs.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some(timestamp) = ref_timestamp(ref_name) else {
                continue;
            };
            if now.saturating_sub(timestamp) <= retention_ms {
                continue;
            }
            match run_git_ok(&self.project_dir, &[], &["update-ref", "-d", ref_name]).await {
                Ok(_) => removed += 1,
                Err(err) => return SnapshotResult::fail(err),
            }
        }
        tracing::debug!(removed, "snapshot cleanup");
        SnapshotResult::done()
    }

    /// Path for a one-shot scratch index inside the git directory.
    async fn scratch_index(&self) -> Result<PathBuf, String> {
        let dir = git_dir(&self.project_dir).await?;
        Ok(dir.join(format!("hew-index-{}-{}", std::process::id(), self.clock.epoch_ms())))
    }
}

/// Map a `--name-status` listing to the status of one path.
fn status_for(name_status: &str, path: &str) -> FileStatus {
    for line in name_status.lines() {
        let mut parts = line.split('\t');
        let code = parts.next().unwrap_or("");
        let rest: Vec<&str> = parts.collect();
        if !rest.iter().any(|p| *p == path) {
            continue;
        }
        return match code.chars().next() {
            Some('A') => FileStatus::Added,
            Some('D') => FileStatus::Deleted,
            Some('R') => FileStatus::Renamed,
            _ => FileStatus::Modified,
        };
    }
    FileStatus::Modified
}

/// Extract the epoch-ms prefix from `refs/hew/snapshots/<ms>-<short>`.
fn ref_timestamp(ref_name: &str) -> Option<u64> {
    let leaf = ref_name.rsplit('/').next()?;
    let (timestamp, _) = leaf.split_once('-')?;
    timestamp.parse().ok()
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
