// SPDX-License-Identifier: MIT

//! Sessions, their append-only message trees, tool calls, and todos.
//!
//! Deleting a session cascades through messages, parts, tool calls,
//! todos, and pending questions via foreign keys.

use crate::db::Storage;
use crate::error::{StorageError, StorageResult};
use hew_core::{Clock, MessageId, SessionId, TimelineEvent, TodoId, ToolCallId};
use rusqlite::params;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub title: String,
    pub project_dir: String,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    fn parse(s: &str) -> StorageResult<Self> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(StorageError::Corrupt(format!("unknown role: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    Text,
    Reasoning,
    Status,
}

impl PartKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Reasoning => "reasoning",
            Self::Status => "status",
        }
    }

    fn parse(s: &str) -> StorageResult<Self> {
        match s {
            "text" => Ok(Self::Text),
            "reasoning" => Ok(Self::Reasoning),
            "status" => Ok(Self::Status),
            other => Err(StorageError::Corrupt(format!("unknown part kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: SessionId,
    pub parent_id: Option<MessageId>,
    pub role: Role,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePart {
    pub message_id: MessageId,
    pub kind: PartKind,
    pub content: String,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: ToolCallId,
    pub message_id: MessageId,
    pub tool: String,
    pub arguments: serde_json::Value,
    pub output: Option<String>,
    pub is_error: bool,
    pub created_at: u64,
    pub completed_at: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    fn parse(s: &str) -> StorageResult<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(StorageError::Corrupt(format!("unknown todo status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub session_id: SessionId,
    pub content: String,
    pub status: TodoStatus,
    pub position: u32,
}

impl<C: Clock> Storage<C> {
    pub fn create_session(&self, project_dir: &str, title: &str) -> StorageResult<Session> {
        let session = Session {
            id: SessionId::new(),
            title: title.to_string(),
            project_dir: project_dir.to_string(),
            created_at: self.now_ms(),
            updated_at: self.now_ms(),
        };
        self.conn()?.execute(
            "INSERT INTO sessions (id, title, project_dir, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id.as_str(),
                session.title,
                session.project_dir,
                session.created_at,
                session.updated_at
            ],
        )?;
        Ok(session)
    }

    pub fn get_session(&self, id: &SessionId) -> StorageResult<Option<Session>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT id, title, project_dir, created_at, updated_at FROM sessions WHERE id = ?1",
            params![id.as_str()],
            |row| {
                Ok(Session {
                    id: SessionId::from_string(row.get::<_, String>(0)?),
                    title: row.get(1)?,
                    project_dir: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        );
        optional(result)
    }

    pub fn list_sessions(&self, project_dir: Option<&str>) -> StorageResult<Vec<Session>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, project_dir, created_at, updated_at FROM sessions
             WHERE ?1 IS NULL OR project_dir = ?1
             ORDER BY updated_at DESC",
        )?;
        let sessions = stmt
            .query_map(params![project_dir], |row| {
                Ok(Session {
                    id: SessionId::from_string(row.get::<_, String>(0)?),
                    title: row.get(1)?,
                    project_dir: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    pub fn touch_session(&self, id: &SessionId) -> StorageResult<()> {
        self.conn()?.execute(
            "UPDATE sessions SET updated_at = ?2 WHERE id = ?1",
            params![id.as_str(), self.now_ms()],
        )?;
        Ok(())
    }

    /// Remove a session and, through the foreign keys, every descendant
    /// row.
    pub fn delete_session(&self, id: &SessionId) -> StorageResult<bool> {
        let rows = self
            .conn()?
            .execute("DELETE FROM sessions WHERE id = ?1", params![id.as_str()])?;
        Ok(rows > 0)
    }

    /// Append a message to the session tree. The tree is append-only;
    /// there is no update path.
    pub fn append_message(
        &self,
        session_id: &SessionId,
        parent_id: Option<&MessageId>,
        role: Role,
    ) -> StorageResult<Message> {
        let message = Message {
            id: MessageId::new(),
            session_id: *session_id,
            parent_id: parent_id.copied(),
            role,
            created_at: self.now_ms(),
        };
        self.conn()?.execute(
            "INSERT INTO messages (id, session_id, parent_id, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id.as_str(),
                session_id.as_str(),
                parent_id.map(|p| p.as_str().to_string()),
                role.as_str(),
                message.created_at
            ],
        )?;
        self.touch_session(session_id)?;
        Ok(message)
    }

    pub fn add_part(
        &self,
        message_id: &MessageId,
        kind: PartKind,
        content: &str,
        position: u32,
    ) -> StorageResult<()> {
        self.conn()?.execute(
            "INSERT INTO message_parts (message_id, kind, content, position)
             VALUES (?1, ?2, ?3, ?4)",
            params![message_id.as_str(), kind.as_str(), content, position],
        )?;
        Ok(())
    }

    pub fn record_tool_call(
        &self,
        message_id: &MessageId,
        tool: &str,
        arguments: &serde_json::Value,
    ) -> StorageResult<ToolCallRecord> {
        let record = ToolCallRecord {
            id: ToolCallId::new(),
            message_id: *message_id,
            tool: tool.to_string(),
            arguments: arguments.clone(),
            output: None,
            is_error: false,
            created_at: self.now_ms(),
            completed_at: None,
        };
        self.conn()?.execute(
            "INSERT INTO tool_calls (id, message_id, tool, arguments, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id.as_str(),
                message_id.as_str(),
                record.tool,
                record.arguments.to_string(),
                record.created_at
            ],
        )?;
        Ok(record)
    }

    pub fn complete_tool_call(
        &self,
        id: &ToolCallId,
        output: &str,
        is_error: bool,
    ) -> StorageResult<()> {
        let rows = self.conn()?.execute(
            "UPDATE tool_calls SET output = ?2, is_error = ?3, completed_at = ?4 WHERE id = ?1",
            params![id.as_str(), output, is_error, self.now_ms()],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound { what: "tool call", id: id.to_string() });
        }
        Ok(())
    }

    pub fn upsert_todo(
        &self,
        session_id: &SessionId,
        todo_id: Option<&TodoId>,
        content: &str,
        status: TodoStatus,
        position: u32,
    ) -> StorageResult<Todo> {
        let todo = Todo {
            id: todo_id.copied().unwrap_or_default(),
            session_id: *session_id,
            content: content.to_string(),
            status,
            position,
        };
        self.conn()?.execute(
            "INSERT INTO todos (id, session_id, content, status, position, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                status = excluded.status,
                position = excluded.position,
                updated_at = excluded.updated_at",
            params![
                todo.id.as_str(),
                session_id.as_str(),
                todo.content,
                status.as_str(),
                position,
                self.now_ms()
            ],
        )?;
        Ok(todo)
    }

    pub fn list_todos(&self, session_id: &SessionId) -> StorageResult<Vec<Todo>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, session_id, content, status, position FROM todos
             WHERE session_id = ?1 ORDER BY position, created_at",
        )?;
        let rows = stmt
            .query_map(params![session_id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u32>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, session, content, status, position)| {
                Ok(Todo {
                    id: TodoId::from_string(id),
                    session_id: SessionId::from_string(session),
                    content,
                    status: TodoStatus::parse(&status)?,
                    position,
                })
            })
            .collect()
    }

    pub fn count_messages(&self, session_id: &SessionId) -> StorageResult<u64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
            params![session_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Project the session's rows into ordered timeline events: message
    /// parts become User/Assistant/Reasoning/Status entries, tool calls
    /// become a call event plus a result event once completed.
    pub fn timeline(&self, session_id: &SessionId) -> StorageResult<Vec<TimelineEvent>> {
        let conn = self.conn()?;
        let mut events: Vec<TimelineEvent> = Vec::new();

        let mut messages = conn.prepare_cached(
            "SELECT id, role, created_at FROM messages WHERE session_id = ?1 ORDER BY created_at, id",
        )?;
        let message_rows = messages
            .query_map(params![session_id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut parts_stmt = conn.prepare_cached(
            "SELECT kind, content, position FROM message_parts WHERE message_id = ?1 ORDER BY position",
        )?;
        let mut calls_stmt = conn.prepare_cached(
            "SELECT id, tool, arguments, output, is_error, created_at, completed_at
             FROM tool_calls WHERE message_id = ?1 ORDER BY created_at, id",
        )?;

        for (message_id, role, created_at) in message_rows {
            let role = Role::parse(&role)?;
            let id = MessageId::from_string(&message_id);

            let parts = parts_stmt
                .query_map(params![message_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            for (kind, content) in parts {
                let event = match PartKind::parse(&kind)? {
                    PartKind::Text => match role {
                        Role::User => TimelineEvent::User {
                            message_id: id,
                            text: content,
                            at_ms: created_at,
                        },
                        Role::Assistant => TimelineEvent::Assistant {
                            message_id: id,
                            text: content,
                            at_ms: created_at,
                        },
                    },
                    PartKind::Reasoning => TimelineEvent::Reasoning {
                        message_id: id,
                        text: content,
                        at_ms: created_at,
                    },
                    PartKind::Status => TimelineEvent::Status { text: content, at_ms: created_at },
                };
                events.push(event);
            }

            let calls = calls_stmt
                .query_map(params![message_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, u64>(5)?,
                        row.get::<_, Option<u64>>(6)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            for (call_id, tool, arguments, output, is_error, call_at, completed_at) in calls {
                let call_id = ToolCallId::from_string(call_id);
                let arguments = serde_json::from_str(&arguments)
                    .map_err(|err| StorageError::Corrupt(format!("tool arguments: {err}")))?;
                events.push(TimelineEvent::ToolCall {
                    message_id: id,
                    call_id,
                    tool: tool.clone(),
                    arguments,
                    at_ms: call_at,
                });
                if let (Some(output), Some(completed_at)) = (output, completed_at) {
                    events.push(TimelineEvent::ToolResult {
                        message_id: id,
                        call_id,
                        tool,
                        output,
                        is_error,
                        at_ms: completed_at,
                    });
                }
            }
        }

        Ok(events)
    }
}

pub(crate) fn optional<T>(result: Result<T, rusqlite::Error>) -> StorageResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
