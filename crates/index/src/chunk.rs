// SPDX-License-Identifier: MIT

//! Line-aligned chunking with overlap.

use serde::{Deserialize, Serialize};

/// One indexable slice of a source file.
///
/// `id` is derived from `(file_path, start_line)` so re-indexing the same
/// position replaces the point in place instead of accumulating
/// duplicates. Lines are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChunk {
    pub id: String,
    pub file_path: String,
    pub language: String,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
    pub indexed_at: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkOptions {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters carried from the tail of one chunk into the next.
    pub chunk_overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self { chunk_size: 1500, chunk_overlap: 200 }
    }
}

/// Split `text` into chunks on line boundaries.
///
/// A chunk closes when the next line would push it past `chunk_size`;
/// the tail lines summing to at least `chunk_overlap` characters are
/// carried into the next chunk so matches spanning a boundary stay
/// findable.
pub fn chunk_lines(
    file_path: &str,
    language: &str,
    text: &str,
    options: ChunkOptions,
    indexed_at: u64,
) -> Vec<FileChunk> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut chunks = Vec::new();

    let mut buf: Vec<&str> = Vec::new();
    let mut buf_len = 0usize;
    let mut start_line = 1usize;

    for (idx, line) in lines.iter().enumerate() {
        let line_len = line.len() + 1;
        if buf_len + line_len > options.chunk_size && !buf.is_empty() {
            push_chunk(&mut chunks, file_path, language, &buf, start_line, indexed_at);

            // Carry trailing lines into the next chunk, always leaving at
            // least one line of forward progress.
            let mut keep = 0usize;
            let mut keep_len = 0usize;
            while keep + 1 < buf.len() && keep_len < options.chunk_overlap {
                keep += 1;
                keep_len += buf[buf.len() - keep].len() + 1;
            }
            start_line = idx + 1 - keep;
            buf = buf[buf.len() - keep..].to_vec();
            buf_len = keep_len;
        }
        buf.push(line);
        buf_len += line_len;
    }

    if buf.iter().any(|line| !line.trim().is_empty()) {
        push_chunk(&mut chunks, file_path, language, &buf, start_line, indexed_at);
    }

    chunks
}

fn push_chunk(
    chunks: &mut Vec<FileChunk>,
    file_path: &str,
    language: &str,
    lines: &[&str],
    start_line: usize,
    indexed_at: u64,
) {
    let end_line = start_line + lines.len() - 1;
    chunks.push(FileChunk {
        id: format!("{file_path}:{start_line}"),
        file_path: file_path.to_string(),
        language: language.to_string(),
        start_line,
        end_line,
        text: lines.join("\n"),
        indexed_at,
    });
}

#[cfg(test)]
#[path = "chunk_tests.rs"]
mod tests;
