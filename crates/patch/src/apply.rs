// SPDX-License-Identifier: MIT

//! Patch application: splice hunks into line arrays and write the result.

use crate::error::PatchError;
use crate::parse::{Hunk, HunkLine, Patch};
use std::path::{Path, PathBuf};

/// Outcome of applying a multi-file patch.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyReport {
    pub files: Vec<AppliedFile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedFile {
    pub path: PathBuf,
    pub hunks_applied: usize,
    pub created: bool,
    pub deleted: bool,
}

/// Fold every hunk of a file patch into `content`.
///
/// Maintains a running offset so later hunks land correctly after earlier
/// ones changed the line count. The split/join on `\n` keeps a trailing
/// newline intact: content ending in `\n` yields a final empty element
/// which survives the splice.
pub fn splice_hunks(content: &str, hunks: &[Hunk], path: &Path) -> Result<String, PatchError> {
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    let mut offset: isize = 0;

    for hunk in hunks {
        let start = hunk.old_start as isize - 1 + offset;
        if start < 0 {
            return Err(out_of_bounds(hunk, path, lines.len()));
        }
        let start = start as usize;
        let end = start + hunk.old_count;
        if start > lines.len() || end > lines.len() {
            return Err(out_of_bounds(hunk, path, lines.len()));
        }

        let mut new_lines = Vec::with_capacity(hunk.new_count);
        for line in &hunk.lines {
            match line {
                HunkLine::Context(text) | HunkLine::Add(text) => new_lines.push(text.clone()),
                HunkLine::Remove(_) => {}
            }
        }

        offset += new_lines.len() as isize - hunk.old_count as isize;
        lines.splice(start..end, new_lines);
    }

    Ok(lines.join("\n"))
}

fn out_of_bounds(hunk: &Hunk, path: &Path, len: usize) -> PatchError {
    PatchError::HunkOutOfBounds {
        path: path.to_path_buf(),
        old_start: hunk.old_start,
        old_count: hunk.old_count,
        len,
    }
}

/// Apply a parsed patch under `working_dir`.
///
/// Missing targets read as empty (file creation), parent directories are
/// created, and absolute paths inside the patch bypass `working_dir`.
/// The first failing file aborts with its path in the error; files already
/// written stay written.
pub async fn apply(patch: &Patch, working_dir: &Path) -> Result<ApplyReport, PatchError> {
    let mut report = ApplyReport { files: Vec::new() };

    for file in &patch.files {
        let deleting = file.new_path.is_none();
        let target = match file.target_path() {
            Some(path) => path,
            None => continue,
        };
        let full = if Path::new(target).is_absolute() {
            PathBuf::from(target)
        } else {
            working_dir.join(target)
        };

        let existing = match tokio::fs::read_to_string(&full).await {
            Ok(text) => Some(text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                return Err(PatchError::Io { action: "read", path: full, source: err });
            }
        };
        let created = existing.is_none();
        let content = existing.unwrap_or_default();

        let patched = splice_hunks(&content, &file.hunks, &full)?;

        if deleting {
            tokio::fs::remove_file(&full)
                .await
                .map_err(|err| PatchError::Io { action: "remove", path: full.clone(), source: err })?;
            tracing::debug!(path = %full.display(), "removed file via patch");
        } else {
            if let Some(parent) = full.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|err| PatchError::Io {
                    action: "create parent directory for",
                    path: full.clone(),
                    source: err,
                })?;
            }
            tokio::fs::write(&full, patched.as_bytes())
                .await
                .map_err(|err| PatchError::Io { action: "write", path: full.clone(), source: err })?;
        }

        report.files.push(AppliedFile {
            path: full,
            hunks_applied: file.hunks.len(),
            created,
            deleted: deleting,
        });
    }

    Ok(report)
}

#[cfg(test)]
#[path = "apply_tests.rs"]
mod tests;
