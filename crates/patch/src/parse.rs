// SPDX-License-Identifier: MIT

//! Unified-diff parser.
//!
//! Recognises `--- old` / `+++ new` file headers followed by one or more
//! `@@ -oldStart[,oldCount] +newStart[,newCount] @@` hunks. Leading `a/`
//! and `b/` segments are stripped from paths; `/dev/null` marks creation
//! or deletion. A file section with a header but zero hunks rejects the
//! whole patch before anything is written.

use crate::error::PatchError;

/// A parsed multi-file patch.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub files: Vec<FilePatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilePatch {
    /// Old-side path, `None` for `/dev/null` (file creation).
    pub old_path: Option<String>,
    /// New-side path, `None` for `/dev/null` (file deletion).
    pub new_path: Option<String>,
    pub hunks: Vec<Hunk>,
}

impl FilePatch {
    /// The path the patch applies to: the new side unless it is being
    /// deleted, then the old side.
    pub fn target_path(&self) -> Option<&str> {
        self.new_path.as_deref().or(self.old_path.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hunk {
    /// 1-based first line on the old side.
    pub old_start: usize,
    pub old_count: usize,
    /// 1-based first line on the new side.
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HunkLine {
    Context(String),
    Add(String),
    Remove(String),
}

/// Parse a unified diff covering one or more files.
pub fn parse(input: &str) -> Result<Patch, PatchError> {
    let lines: Vec<&str> = input.lines().collect();
    let mut files = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if !lines[i].starts_with("--- ") {
            i += 1;
            continue;
        }
        let old_path = parse_header_path(lines[i], "--- ");
        let plus = lines.get(i + 1).copied().unwrap_or("");
        if !plus.starts_with("+++ ") {
            return Err(PatchError::BadFileHeader { line: i + 2, text: plus.to_string() });
        }
        let new_path = parse_header_path(plus, "+++ ");
        i += 2;

        let mut hunks = Vec::new();
        while i < lines.len() && lines[i].starts_with("@@ -") {
            let (mut hunk, header_line) = parse_hunk_header(lines[i], i + 1)?;
            i = header_line;

            let mut old_remaining = hunk.old_count;
            let mut new_remaining = hunk.new_count;
            while i < lines.len() && (old_remaining > 0 || new_remaining > 0) {
                let line = lines[i];
                if line.starts_with("@@ -") || line.starts_with("--- ") {
                    break;
                }
                match line.as_bytes().first() {
                    Some(b'+') => {
                        hunk.lines.push(HunkLine::Add(line[1..].to_string()));
                        new_remaining = new_remaining.saturating_sub(1);
                    }
                    Some(b'-') => {
                        hunk.lines.push(HunkLine::Remove(line[1..].to_string()));
                        old_remaining = old_remaining.saturating_sub(1);
                    }
                    Some(b'\\') => {
                        // "\ No newline at end of file" marker; the splice
                        // works on whole lines, so nothing to record.
                    }
                    Some(b' ') => {
                        hunk.lines.push(HunkLine::Context(line[1..].to_string()));
                        old_remaining = old_remaining.saturating_sub(1);
                        new_remaining = new_remaining.saturating_sub(1);
                    }
                    None => {
                        // An empty body line is empty context.
                        hunk.lines.push(HunkLine::Context(String::new()));
                        old_remaining = old_remaining.saturating_sub(1);
                        new_remaining = new_remaining.saturating_sub(1);
                    }
                    Some(_) => break,
                }
                i += 1;
            }
            hunks.push(hunk);
        }

        if hunks.is_empty() {
            let path = new_path
                .clone()
                .or_else(|| old_path.clone())
                .unwrap_or_else(|| "/dev/null".to_string());
            return Err(PatchError::NoHunks { path });
        }
        files.push(FilePatch { old_path, new_path, hunks });
    }

    if files.is_empty() {
        return Err(PatchError::Empty);
    }
    Ok(Patch { files })
}

/// Extract the path from a `--- ` or `+++ ` header line.
///
/// Strips a trailing tab-separated timestamp, a leading `a/` or `b/`
/// segment, and maps `/dev/null` to `None`.
fn parse_header_path(line: &str, prefix: &str) -> Option<String> {
    let rest = line.strip_prefix(prefix).unwrap_or(line);
    let rest = rest.split('\t').next().unwrap_or(rest).trim_end();
    if rest == "/dev/null" {
        return None;
    }
    let stripped = rest
        .strip_prefix("a/")
        .or_else(|| rest.strip_prefix("b/"))
        .unwrap_or(rest);
    Some(stripped.to_string())
}

/// Parse `@@ -oldStart[,oldCount] +newStart[,newCount] @@`, returning the
/// empty hunk and the index of the first body line.
fn parse_hunk_header(line: &str, line_no: usize) -> Result<(Hunk, usize), PatchError> {
    let bad = || PatchError::BadHunkHeader { line: line_no, text: line.to_string() };

    let inner = line
        .strip_prefix("@@ -")
        .and_then(|rest| rest.split_once(" @@").map(|(spans, _)| spans))
        .ok_or_else(bad)?;
    let (old_span, new_span) = inner.split_once(" +").ok_or_else(bad)?;
    let (old_start, old_count) = parse_span(old_span).ok_or_else(bad)?;
    let (new_start, new_count) = parse_span(new_span).ok_or_else(bad)?;

    Ok((
        Hunk {
            old_start,
            old_count,
            new_start,
            new_count,
            lines: Vec::new(),
        },
        line_no,
    ))
}

/// Parse `start[,count]`; count defaults to 1.
fn parse_span(span: &str) -> Option<(usize, usize)> {
    match span.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((span.parse().ok()?, 1)),
    }
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
