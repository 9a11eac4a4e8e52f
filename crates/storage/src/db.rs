// SPDX-License-Identifier: MIT

//! Database handle with connection pooling.
//!
//! `rusqlite::Connection` is not `Sync`, so a small r2d2 pool mediates
//! thread-safe access. The clock is injected: ranking, decay, and
//! retention all reason about elapsed time and must be testable without
//! sleeping.

use crate::error::{StorageError, StorageResult};
use crate::schema::{apply_pragmas, init_schema};
use hew_core::Clock;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::{Path, PathBuf};

pub struct Storage<C: Clock> {
    pool: Pool<SqliteConnectionManager>,
    pub(crate) clock: C,
}

impl<C: Clock> Storage<C> {
    /// Open (or create) the database at an explicit path.
    pub fn open(path: &Path, clock: C) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| StorageError::Io(format!("cannot create {}: {err}", parent.display())))?;
        }
        let manager = SqliteConnectionManager::file(path);
        Self::build(manager, 4, clock)
    }

    /// Open the per-user database under the home directory.
    pub fn open_default(clock: C) -> StorageResult<Self> {
        let home = dirs::home_dir().ok_or(StorageError::NoHome)?;
        Self::open(&home.join(".hew").join("hew.db"), clock)
    }

    /// In-memory database for tests. Pool size 1: each in-memory
    /// connection would otherwise be its own database.
    pub fn in_memory(clock: C) -> StorageResult<Self> {
        Self::build(SqliteConnectionManager::memory(), 1, clock)
    }

    fn build(
        manager: SqliteConnectionManager,
        max_size: u32,
        clock: C,
    ) -> StorageResult<Self> {
        let pool = Pool::builder().max_size(max_size).build(manager)?;
        {
            let conn = pool.get()?;
            apply_pragmas(&conn)?;
            init_schema(&conn)?;
        }
        Ok(Self { pool, clock })
    }

    pub(crate) fn conn(&self) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        let conn = self.pool.get()?;
        // Pragmas are per-connection; foreign_keys especially must hold on
        // every one the pool hands out.
        apply_pragmas(&conn)?;
        Ok(conn)
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }
}

/// Default location of the database file, for diagnostics.
pub fn default_db_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hew").join("hew.db"))
}
