// SPDX-License-Identifier: MIT

//! Minimal unified-diff synthesis.
//!
//! Builds a change script with bounded lookahead, then coalesces nearby
//! changes into hunks with three lines of surrounding context. Applying
//! the emitted diff to the old text reproduces the new text.

/// How far ahead each cursor searches for a resynchronisation point.
/// Larger values trade CPU for smaller diffs on reorganised files.
const LOOKAHEAD: usize = 5;

/// Context lines kept on each side of a hunk.
const CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Context,
    Add,
    Remove,
}

struct Token<'a> {
    kind: Kind,
    text: &'a str,
}

/// Produce a unified diff turning `old_text` into `new_text`, labelled
/// with `path` in the file headers. Returns the empty string when the
/// texts are line-identical.
pub fn synthesize(old_text: &str, new_text: &str, path: &str) -> String {
    let old: Vec<&str> = old_text.split('\n').collect();
    let new: Vec<&str> = new_text.split('\n').collect();
    let script = change_script(&old, &new);

    if !script.iter().any(|t| t.kind != Kind::Context) {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(&format!("--- a/{path}\n+++ b/{path}\n"));

    for (range_start, range_end) in hunk_ranges(&script) {
        // Line numbers come from counting the script before the range:
        // context and remove advance the old side, context and add the new.
        let mut old_before = 0usize;
        let mut new_before = 0usize;
        for token in &script[..range_start] {
            match token.kind {
                Kind::Context => {
                    old_before += 1;
                    new_before += 1;
                }
                Kind::Remove => old_before += 1,
                Kind::Add => new_before += 1,
            }
        }

        let mut old_count = 0usize;
        let mut new_count = 0usize;
        for token in &script[range_start..range_end] {
            match token.kind {
                Kind::Context => {
                    old_count += 1;
                    new_count += 1;
                }
                Kind::Remove => old_count += 1,
                Kind::Add => new_count += 1,
            }
        }

        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_before + 1,
            old_count,
            new_before + 1,
            new_count
        ));
        for token in &script[range_start..range_end] {
            let prefix = match token.kind {
                Kind::Context => ' ',
                Kind::Add => '+',
                Kind::Remove => '-',
            };
            out.push(prefix);
            out.push_str(token.text);
            out.push('\n');
        }
    }

    out
}

/// Two-cursor walk with bounded lookahead in each direction.
fn change_script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Token<'a>> {
    let mut script = Vec::new();
    let mut i = 0;
    let mut j = 0;

    while i < old.len() || j < new.len() {
        if i >= old.len() {
            script.push(Token { kind: Kind::Add, text: new[j] });
            j += 1;
        } else if j >= new.len() {
            script.push(Token { kind: Kind::Remove, text: old[i] });
            i += 1;
        } else if old[i] == new[j] {
            script.push(Token { kind: Kind::Context, text: old[i] });
            i += 1;
            j += 1;
        } else {
            // Distance to a line on the old side matching new[j], and to a
            // line on the new side matching old[i].
            let found_old = (1..=LOOKAHEAD).find(|d| i + d < old.len() && old[i + d] == new[j]);
            let found_new = (1..=LOOKAHEAD).find(|d| j + d < new.len() && new[j + d] == old[i]);

            match (found_old, found_new) {
                (_, Some(dn)) if found_old.is_none() || dn <= found_old.unwrap_or(usize::MAX) => {
                    for _ in 0..dn {
                        script.push(Token { kind: Kind::Add, text: new[j] });
                        j += 1;
                    }
                }
                (Some(d_old), _) => {
                    for _ in 0..d_old {
                        script.push(Token { kind: Kind::Remove, text: old[i] });
                        i += 1;
                    }
                }
                _ => {
                    script.push(Token { kind: Kind::Remove, text: old[i] });
                    script.push(Token { kind: Kind::Add, text: new[j] });
                    i += 1;
                    j += 1;
                }
            }
        }
    }

    script
}

/// Group non-context positions into hunk ranges.
///
/// Changes separated by at most `2 * CONTEXT + 1` context tokens share a
/// hunk; each range then grows by `CONTEXT` on both sides, clamped to the
/// script.
fn hunk_ranges(script: &[Token<'_>]) -> Vec<(usize, usize)> {
    let changes: Vec<usize> = script
        .iter()
        .enumerate()
        .filter(|(_, t)| t.kind != Kind::Context)
        .map(|(idx, _)| idx)
        .collect();

    let mut ranges = Vec::new();
    let mut group_start = match changes.first() {
        Some(&first) => first,
        None => return ranges,
    };
    let mut group_end = group_start;

    for &change in &changes[1..] {
        if change - group_end - 1 <= 2 * CONTEXT + 1 {
            group_end = change;
        } else {
            ranges.push(expand(group_start, group_end, script.len()));
            group_start = change;
            group_end = change;
        }
    }
    ranges.push(expand(group_start, group_end, script.len()));
    ranges
}

fn expand(start: usize, end: usize, len: usize) -> (usize, usize) {
    (start.saturating_sub(CONTEXT), (end + CONTEXT + 1).min(len))
}

#[cfg(test)]
#[path = "synth_tests.rs"]
mod tests;
