// SPDX-License-Identifier: MIT

//! Project walking and the compiled glob matcher.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directories never descended into.
pub const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    ".next",
    "target",
    "coverage",
    "__pycache__",
];

/// File name globs excluded from indexing (lockfiles and friends).
pub const IGNORED_FILE_GLOBS: &[&str] =
    &["*.lock", "*-lock.json", "*-lock.yaml", "*.lockb", "*.sum"];

/// Extensions accepted as indexable source.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "rs", "go", "java", "rb", "php", "c", "h",
    "cpp", "hpp", "cs", "swift", "kt", "scala", "sh", "json", "yaml", "yml", "toml", "md", "sql",
    "html", "css", "vue", "svelte",
];

/// A compiled glob pattern.
///
/// Not a general regex: `**` crosses path separators, `*` matches within
/// one segment, `?` matches a single non-separator character, everything
/// else is literal. Matches are anchored at both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Glob {
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Literal(char),
    /// `?`
    AnyChar,
    /// `*`
    AnySpan,
    /// `**`
    AnyPath,
}

impl Glob {
    pub fn compile(pattern: &str) -> Self {
        let mut tokens = Vec::new();
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    if chars.peek() == Some(&'*') {
                        chars.next();
                        tokens.push(Token::AnyPath);
                    } else {
                        tokens.push(Token::AnySpan);
                    }
                }
                '?' => tokens.push(Token::AnyChar),
                other => tokens.push(Token::Literal(other)),
            }
        }
        Self { tokens }
    }

    pub fn matches(&self, text: &str) -> bool {
        let chars: Vec<char> = text.chars().collect();
        match_at(&self.tokens, &chars, 0, 0)
    }
}

/// Backtracking matcher over the token program.
fn match_at(tokens: &[Token], text: &[char], ti: usize, ci: usize) -> bool {
    if ti == tokens.len() {
        return ci == text.len();
    }
    match tokens[ti] {
        Token::Literal(expected) => {
            ci < text.len() && text[ci] == expected && match_at(tokens, text, ti + 1, ci + 1)
        }
        Token::AnyChar => {
            ci < text.len() && text[ci] != '/' && match_at(tokens, text, ti + 1, ci + 1)
        }
        Token::AnySpan => {
            // Greedy within a segment, backtracking toward empty.
            let mut end = ci;
            while end < text.len() && text[end] != '/' {
                end += 1;
            }
            loop {
                if match_at(tokens, text, ti + 1, end) {
                    return true;
                }
                if end == ci {
                    return false;
                }
                end -= 1;
            }
        }
        Token::AnyPath => {
            let mut end = text.len();
            loop {
                if match_at(tokens, text, ti + 1, end) {
                    return true;
                }
                if end == ci {
                    return false;
                }
                end -= 1;
            }
        }
    }
}

/// Per-pattern cache of compiled globs, shared by clone.
#[derive(Debug, Clone, Default)]
pub struct GlobCache {
    compiled: Arc<Mutex<HashMap<String, Arc<Glob>>>>,
}

impl GlobCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matches(&self, pattern: &str, text: &str) -> bool {
        let glob = {
            let mut compiled = self.compiled.lock();
            compiled
                .entry(pattern.to_string())
                .or_insert_with(|| Arc::new(Glob::compile(pattern)))
                .clone()
        };
        glob.matches(text)
    }
}

/// Collect indexable source files under `root`, depth first, in sorted
/// order for deterministic runs.
pub fn walk_source_files(root: &Path) -> Vec<PathBuf> {
    let cache = GlobCache::new();
    let mut files = Vec::new();
    walk_dir(root, &cache, &mut files);
    files
}

fn walk_dir(dir: &Path, cache: &GlobCache, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut entries: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    entries.sort();

    for path in entries {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if path.is_dir() {
            if IGNORED_DIRS.contains(&name) {
                continue;
            }
            walk_dir(&path, cache, out);
        } else if is_source_file(&path, name, cache) {
            out.push(path);
        }
    }
}

fn is_source_file(path: &Path, name: &str, cache: &GlobCache) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !SOURCE_EXTENSIONS.contains(&ext) {
        return false;
    }
    !IGNORED_FILE_GLOBS.iter().any(|pattern| cache.matches(pattern, name))
}

#[cfg(test)]
#[path = "walk_tests.rs"]
mod tests;
