// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hew-storage: the embedded persistence layer.
//!
//! One SQLite file per user holds sessions, their message trees, tool
//! calls, todos, pending questions, and error memories. Reads and writes
//! are synchronous (local SQLite is fast and the pool keeps connections
//! thread-safe), while the question broker layers one-shot channels on
//! top so a tool can suspend until a UI answers.

mod db;
mod error;
mod memories;
mod questions;
mod schema;
mod sessions;

pub use db::{default_db_path, Storage};
pub use error::StorageError;
pub use memories::{ErrorMemory, PruneOptions};
pub use questions::{AskError, PendingQuestion, Question, QuestionBroker, QuestionState};
pub use sessions::{
    Message, MessagePart, PartKind, Role, Session, Todo, TodoStatus, ToolCallRecord,
};
