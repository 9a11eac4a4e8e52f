// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("invalid stored value: {0}")]
    Corrupt(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("no home directory for the database file")]
    NoHome,
}

pub type StorageResult<T> = Result<T, StorageError>;
