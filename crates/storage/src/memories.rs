// SPDX-License-Identifier: MIT

//! Error memories: decay-weighted lessons learned from tool failures.
//!
//! Scope is nullable; `None` means the lesson is global, otherwise it
//! names a project directory. `(scope, error_hash)` is the effective
//! identity; saves against an existing pair fold into the stored row.

use crate::db::Storage;
use crate::error::StorageResult;
use crate::sessions::optional;
use hew_core::{Clock, MemoryId};
use rusqlite::params;
use serde::{Deserialize, Serialize};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Reciprocal of ln 2, so a half-life parameter means what it says.
const HALF_LIFE_FACTOR: f64 = 1.44;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMemory {
    pub id: MemoryId,
    /// `None` = global scope, otherwise a project directory.
    pub scope: Option<String>,
    pub tool_name: String,
    pub error_pattern: String,
    pub lesson: String,
    pub raw_error: String,
    pub error_hash: String,
    pub occurrence_count: u64,
    pub confidence: f64,
    pub last_occurred_at: u64,
    pub created_at: u64,
    pub tags: Vec<String>,
}

impl ErrorMemory {
    /// Ranking score: high confidence, frequently seen, recently seen.
    pub fn score(&self, now_ms: u64) -> f64 {
        let age_days = now_ms.saturating_sub(self.last_occurred_at) as f64 / MS_PER_DAY;
        let frequency = 1.0 + ((self.occurrence_count + 1) as f64).log2();
        let recency = 1.0 / (1.0 + age_days / 7.0);
        self.confidence * frequency * recency
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PruneOptions {
    pub max_age_days: f64,
    pub min_confidence: f64,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self { max_age_days: 90.0, min_confidence: 0.2 }
    }
}

impl<C: Clock> Storage<C> {
    /// Upsert a memory. A save whose `(scope, error_hash)` already exists
    /// folds into that row: the occurrence count grows, confidence keeps
    /// the higher value, and the lesson text refreshes.
    pub fn save_memory(&self, memory: &ErrorMemory) -> StorageResult<ErrorMemory> {
        // Look up before taking a connection: the lookup checks one out
        // itself, and the test pool holds exactly one.
        let existing = self.get_by_hash_in_scope(&memory.error_hash, memory.scope.as_deref())?;
        let conn = self.conn()?;

        if let Some(mut existing) = existing {
            if existing.id != memory.id {
                existing.occurrence_count += 1;
                existing.confidence = existing.confidence.max(memory.confidence);
                existing.lesson = memory.lesson.clone();
                existing.raw_error = memory.raw_error.clone();
                existing.last_occurred_at = self.now_ms();
                conn.execute(
                    "UPDATE error_memories SET occurrence_count = ?2, confidence = ?3,
                        lesson = ?4, raw_error = ?5, last_occurred_at = ?6
                     WHERE id = ?1",
                    params![
                        existing.id.as_str(),
                        existing.occurrence_count,
                        existing.confidence,
                        existing.lesson,
                        existing.raw_error,
                        existing.last_occurred_at
                    ],
                )?;
                return Ok(existing);
            }
        }

        conn.execute(
            "INSERT INTO error_memories (id, project_dir, tool_name, error_pattern, lesson,
                raw_error, error_hash, occurrence_count, confidence, last_occurred_at,
                created_at, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
                project_dir = excluded.project_dir,
                tool_name = excluded.tool_name,
                error_pattern = excluded.error_pattern,
                lesson = excluded.lesson,
                raw_error = excluded.raw_error,
                error_hash = excluded.error_hash,
                occurrence_count = excluded.occurrence_count,
                confidence = excluded.confidence,
                last_occurred_at = excluded.last_occurred_at,
                tags = excluded.tags",
            params![
                memory.id.as_str(),
                memory.scope,
                memory.tool_name,
                memory.error_pattern,
                memory.lesson,
                memory.raw_error,
                memory.error_hash,
                memory.occurrence_count,
                memory.confidence,
                memory.last_occurred_at,
                memory.created_at,
                serde_json::to_string(&memory.tags).unwrap_or_else(|_| "[]".to_string())
            ],
        )?;
        Ok(memory.clone())
    }

    /// Look a memory up by hash: project scope first when one is given,
    /// falling back to global; global only when no scope is given.
    pub fn get_by_hash(
        &self,
        error_hash: &str,
        scope: Option<&str>,
    ) -> StorageResult<Option<ErrorMemory>> {
        if let Some(scope) = scope {
            if let Some(found) = self.get_by_hash_in_scope(error_hash, Some(scope))? {
                return Ok(Some(found));
            }
        }
        self.get_by_hash_in_scope(error_hash, None)
    }

    fn get_by_hash_in_scope(
        &self,
        error_hash: &str,
        scope: Option<&str>,
    ) -> StorageResult<Option<ErrorMemory>> {
        let conn = self.conn()?;
        let result = match scope {
            Some(scope) => conn.query_row(
                &format!("{SELECT_MEMORY} WHERE error_hash = ?1 AND project_dir = ?2"),
                params![error_hash, scope],
                row_to_memory,
            ),
            None => conn.query_row(
                &format!("{SELECT_MEMORY} WHERE error_hash = ?1 AND project_dir IS NULL"),
                params![error_hash],
                row_to_memory,
            ),
        };
        optional(result)
    }

    /// Memories visible from a scope (project-specific plus global),
    /// ranked by the decay-weighted score.
    pub fn list_memories(&self, scope: Option<&str>, limit: usize) -> StorageResult<Vec<ErrorMemory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "{SELECT_MEMORY} WHERE project_dir IS NULL OR project_dir = ?1"
        ))?;
        let mut memories = stmt
            .query_map(params![scope], row_to_memory)?
            .collect::<Result<Vec<_>, _>>()?;

        let now = self.now_ms();
        memories.sort_by(|a, b| {
            b.score(now)
                .partial_cmp(&a.score(now))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        memories.truncate(limit);
        Ok(memories)
    }

    /// Substring search over lesson, pattern, and tags.
    pub fn search_memories(
        &self,
        query: &str,
        scope: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<ErrorMemory>> {
        let conn = self.conn()?;
        let needle = format!("%{query}%");
        let mut stmt = conn.prepare_cached(&format!(
            "{SELECT_MEMORY}
             WHERE (project_dir IS NULL OR project_dir = ?1)
               AND (lesson LIKE ?2 OR error_pattern LIKE ?2 OR tags LIKE ?2)
             ORDER BY confidence DESC, occurrence_count DESC
             LIMIT ?3"
        ))?;
        let memories = stmt
            .query_map(params![scope, needle, limit as i64], row_to_memory)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(memories)
    }

    /// Delete low-confidence rows, plus stale rows that never recurred.
    /// Returns the total number of rows removed.
    pub fn prune_memories(&self, options: PruneOptions) -> StorageResult<usize> {
        let conn = self.conn()?;
        let mut removed =
            conn.execute("DELETE FROM error_memories WHERE confidence < ?1", params![
                options.min_confidence
            ])?;

        let cutoff = self.now_ms() as f64 - options.max_age_days * MS_PER_DAY;
        removed += conn.execute(
            "DELETE FROM error_memories WHERE last_occurred_at < ?1 AND occurrence_count < 3",
            params![cutoff as i64],
        )?;
        Ok(removed)
    }

    /// Exponential confidence decay with the given half-life. Rows whose
    /// confidence moves by 0.001 or less are left untouched. Returns the
    /// number of rows updated.
    pub fn apply_decay(&self, half_life_days: f64) -> StorageResult<usize> {
        let conn = self.conn()?;
        let now = self.now_ms();
        let lambda = 1.0 / (half_life_days * HALF_LIFE_FACTOR * MS_PER_DAY);

        let mut stmt =
            conn.prepare_cached("SELECT id, confidence, last_occurred_at FROM error_memories")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, u64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut updated = 0usize;
        for (id, confidence, last_occurred_at) in rows {
            let age_ms = now.saturating_sub(last_occurred_at) as f64;
            let decayed = (confidence * (-lambda * age_ms).exp()).max(0.0);
            if (confidence - decayed).abs() > 0.001 {
                conn.execute(
                    "UPDATE error_memories SET confidence = ?2 WHERE id = ?1",
                    params![id, decayed],
                )?;
                updated += 1;
            }
        }
        tracing::debug!(updated, "applied confidence decay");
        Ok(updated)
    }
}

const SELECT_MEMORY: &str = "SELECT id, project_dir, tool_name, error_pattern, lesson, raw_error,
    error_hash, occurrence_count, confidence, last_occurred_at, created_at, tags
    FROM error_memories";

fn row_to_memory(row: &rusqlite::Row<'_>) -> Result<ErrorMemory, rusqlite::Error> {
    let tags: String = row.get(11)?;
    Ok(ErrorMemory {
        id: MemoryId::from_string(row.get::<_, String>(0)?),
        scope: row.get(1)?,
        tool_name: row.get(2)?,
        error_pattern: row.get(3)?,
        lesson: row.get(4)?,
        raw_error: row.get(5)?,
        error_hash: row.get(6)?,
        occurrence_count: row.get(7)?,
        confidence: row.get(8)?,
        last_occurred_at: row.get(9)?,
        created_at: row.get(10)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
    })
}

#[cfg(test)]
#[path = "memories_tests.rs"]
mod tests;
