// SPDX-License-Identifier: MIT

//! The question broker: suspend a tool until a UI answers.
//!
//! `ask` writes a pending row, parks a one-shot sender keyed by the row
//! id, and waits. `answer`, `skip`, and `reject` are invoked from another
//! task (typically a UI) and settle the sender. Rows outlive resolvers:
//! after a restart the pending rows are still there but nobody is
//! waiting on them; answering such a row records the answer and wakes
//! no one.

use crate::db::Storage;
use crate::error::{StorageError, StorageResult};
use crate::sessions::optional;
use hew_core::{Clock, QuestionId, SessionId};
use parking_lot::Mutex;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum AskError {
    /// The user skipped the question. Callers treat this differently from
    /// transport failure.
    #[error("question skipped")]
    Skipped,

    /// The user (or UI) rejected the question outright.
    #[error("question rejected: {0}")]
    Rejected(String),

    /// The parent task cancelled while waiting.
    #[error("question cancelled")]
    Cancelled,

    /// The resolver disappeared without settling (process shutdown).
    #[error("question resolver lost")]
    Lost,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionState {
    Pending,
    Answered,
    Skipped,
}

impl QuestionState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Answered => "answered",
            Self::Skipped => "skipped",
        }
    }

    fn parse(s: &str) -> StorageResult<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "answered" => Ok(Self::Answered),
            "skipped" => Ok(Self::Skipped),
            other => Err(StorageError::Corrupt(format!("unknown question state: {other}"))),
        }
    }
}

/// One question put to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub id: QuestionId,
    pub session_id: SessionId,
    pub state: QuestionState,
    pub questions: Vec<Question>,
    pub answers: Option<Vec<String>>,
    pub tool: Option<String>,
    pub created_at: u64,
    pub answered_at: Option<u64>,
}

type Resolver = oneshot::Sender<Result<Vec<String>, AskError>>;

/// Broker over a shared storage handle. Clone freely; the resolver table
/// is shared.
pub struct QuestionBroker<C: Clock> {
    storage: Arc<Storage<C>>,
    resolvers: Arc<Mutex<HashMap<QuestionId, Resolver>>>,
}

impl<C: Clock> Clone for QuestionBroker<C> {
    fn clone(&self) -> Self {
        Self { storage: self.storage.clone(), resolvers: self.resolvers.clone() }
    }
}

impl<C: Clock> QuestionBroker<C> {
    pub fn new(storage: Arc<Storage<C>>) -> Self {
        Self { storage, resolvers: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Persist a pending question and suspend until a resolver settles it
    /// or the caller cancels.
    pub async fn ask(
        &self,
        session_id: &SessionId,
        questions: Vec<Question>,
        tool: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, AskError> {
        let id = QuestionId::new();
        let questions_json = serde_json::to_string(&questions)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;
        self.storage.conn()?.execute(
            "INSERT INTO pending_questions (id, session_id, state, questions, tool, created_at)
             VALUES (?1, ?2, 'pending', ?3, ?4, ?5)",
            params![
                id.as_str(),
                session_id.as_str(),
                questions_json,
                tool,
                self.storage.now_ms()
            ],
        )
        .map_err(StorageError::from)?;

        let (tx, rx) = oneshot::channel();
        self.resolvers.lock().insert(id, tx);
        tracing::debug!(question = %id, session = %session_id, "question pending");

        tokio::select! {
            settled = rx => match settled {
                Ok(result) => result,
                Err(_) => Err(AskError::Lost),
            },
            _ = cancel.cancelled() => {
                self.resolvers.lock().remove(&id);
                Err(AskError::Cancelled)
            }
        }
    }

    /// Record answers and wake the waiting tool, if any still waits.
    pub fn answer(&self, id: &QuestionId, answers: Vec<String>) -> StorageResult<()> {
        let answers_json = serde_json::to_string(&answers)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;
        let rows = self.storage.conn()?.execute(
            "UPDATE pending_questions SET state = 'answered', answers = ?2, answered_at = ?3
             WHERE id = ?1",
            params![id.as_str(), answers_json, self.storage.now_ms()],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound { what: "question", id: id.to_string() });
        }
        if let Some(tx) = self.resolvers.lock().remove(id) {
            let _ = tx.send(Ok(answers));
        }
        Ok(())
    }

    /// Mark the question skipped and reject the waiting tool.
    pub fn skip(&self, id: &QuestionId) -> StorageResult<()> {
        self.settle_without_answer(id)?;
        if let Some(tx) = self.resolvers.lock().remove(id) {
            let _ = tx.send(Err(AskError::Skipped));
        }
        Ok(())
    }

    /// Reject the waiting tool, with an optional custom message.
    pub fn reject(&self, id: &QuestionId, error: Option<String>) -> StorageResult<()> {
        self.settle_without_answer(id)?;
        if let Some(tx) = self.resolvers.lock().remove(id) {
            let message = error.unwrap_or_else(|| "rejected".to_string());
            let _ = tx.send(Err(AskError::Rejected(message)));
        }
        Ok(())
    }

    fn settle_without_answer(&self, id: &QuestionId) -> StorageResult<()> {
        let rows = self.storage.conn()?.execute(
            "UPDATE pending_questions SET state = 'skipped', answered_at = ?2 WHERE id = ?1",
            params![id.as_str(), self.storage.now_ms()],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound { what: "question", id: id.to_string() });
        }
        Ok(())
    }

    pub fn get_pending(&self, session_id: &SessionId) -> StorageResult<Vec<PendingQuestion>> {
        self.storage.pending_questions(session_id)
    }

    pub fn get_first(&self, session_id: &SessionId) -> StorageResult<Option<PendingQuestion>> {
        Ok(self.storage.pending_questions(session_id)?.into_iter().next())
    }

    pub fn has_pending(&self, session_id: &SessionId) -> StorageResult<bool> {
        Ok(!self.storage.pending_questions(session_id)?.is_empty())
    }
}

impl<C: Clock> Storage<C> {
    /// Pending questions for a session, oldest first. Pure read.
    pub fn pending_questions(&self, session_id: &SessionId) -> StorageResult<Vec<PendingQuestion>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, session_id, state, questions, answers, tool, created_at, answered_at
             FROM pending_questions
             WHERE session_id = ?1 AND state = 'pending'
             ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map(params![session_id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, u64>(6)?,
                    row.get::<_, Option<u64>>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(row_to_question).collect()
    }

    /// A question row regardless of state.
    pub fn get_question(&self, id: &QuestionId) -> StorageResult<Option<PendingQuestion>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT id, session_id, state, questions, answers, tool, created_at, answered_at
             FROM pending_questions WHERE id = ?1",
            params![id.as_str()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, u64>(6)?,
                    row.get::<_, Option<u64>>(7)?,
                ))
            },
        );
        optional(result)?.map(row_to_question).transpose()
    }
}

type QuestionRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    u64,
    Option<u64>,
);

fn row_to_question(row: QuestionRow) -> StorageResult<PendingQuestion> {
    let (id, session_id, state, questions, answers, tool, created_at, answered_at) = row;
    Ok(PendingQuestion {
        id: QuestionId::from_string(id),
        session_id: SessionId::from_string(session_id),
        state: QuestionState::parse(&state)?,
        questions: serde_json::from_str(&questions)
            .map_err(|err| StorageError::Corrupt(format!("questions json: {err}")))?,
        answers: answers
            .map(|a| serde_json::from_str(&a))
            .transpose()
            .map_err(|err| StorageError::Corrupt(format!("answers json: {err}")))?,
        tool,
        created_at,
        answered_at,
    })
}

#[cfg(test)]
#[path = "questions_tests.rs"]
mod tests;
