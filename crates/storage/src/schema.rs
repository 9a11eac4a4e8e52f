// SPDX-License-Identifier: MIT

//! Table definitions and pragmas.

use crate::error::StorageResult;
use rusqlite::Connection;

pub(crate) fn apply_pragmas(conn: &Connection) -> StorageResult<()> {
    // prepare + step handles both void and result-returning pragmas.

    // WAL allows concurrent readers during writes; in-memory databases
    // report "memory" instead, which is fine.
    conn.prepare("PRAGMA journal_mode = WAL")?.query([])?.next()?;

    conn.prepare("PRAGMA synchronous = NORMAL")?.query([])?.next()?;

    // Foreign keys drive the session cascade.
    conn.prepare("PRAGMA foreign_keys = ON")?.query([])?.next()?;

    conn.prepare("PRAGMA busy_timeout = 5000")?.query([])?.next()?;

    Ok(())
}

pub(crate) fn init_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL DEFAULT '',
            project_dir TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            parent_id TEXT REFERENCES messages(id) ON DELETE CASCADE,
            role TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id);
        CREATE INDEX IF NOT EXISTS idx_messages_parent ON messages(parent_id);

        CREATE TABLE IF NOT EXISTS message_parts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            content TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_parts_message ON message_parts(message_id);

        CREATE TABLE IF NOT EXISTS tool_calls (
            id TEXT PRIMARY KEY,
            message_id TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            tool TEXT NOT NULL,
            arguments TEXT NOT NULL DEFAULT '{}',
            output TEXT,
            is_error INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            completed_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_tool_calls_message ON tool_calls(message_id);

        CREATE TABLE IF NOT EXISTS todos (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            position INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_todos_session ON todos(session_id);

        CREATE TABLE IF NOT EXISTS pending_questions (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            state TEXT NOT NULL DEFAULT 'pending',
            questions TEXT NOT NULL,
            answers TEXT,
            tool TEXT,
            created_at INTEGER NOT NULL,
            answered_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_questions_session ON pending_questions(session_id);

        CREATE TABLE IF NOT EXISTS error_memories (
            id TEXT PRIMARY KEY,
            project_dir TEXT,
            tool_name TEXT NOT NULL,
            error_pattern TEXT NOT NULL,
            lesson TEXT NOT NULL,
            raw_error TEXT NOT NULL DEFAULT '',
            error_hash TEXT NOT NULL,
            occurrence_count INTEGER NOT NULL DEFAULT 1,
            confidence REAL NOT NULL DEFAULT 0.5,
            last_occurred_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]'
        );
        CREATE INDEX IF NOT EXISTS idx_memories_hash ON error_memories(error_hash);
        CREATE INDEX IF NOT EXISTS idx_memories_project ON error_memories(project_dir);
        "#,
    )?;
    Ok(())
}
