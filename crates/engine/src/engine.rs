// SPDX-License-Identifier: MIT

//! The engine context object.

use hew_core::{Clock, SessionId, ToolContext};
use hew_index::{Indexer, IndexerConfig};
use hew_lsp::{LspManager, Registry};
use hew_snapshot::Snapshots;
use hew_storage::{QuestionBroker, Storage, StorageError};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub project_dir: PathBuf,
    /// Explicit database file; `None` uses the per-user default under the
    /// home directory.
    pub db_path: Option<PathBuf>,
    pub index: IndexerConfig,
}

impl EngineConfig {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self { project_dir: project_dir.into(), db_path: None, index: IndexerConfig::default() }
    }
}

struct Persistence<C: Clock> {
    storage: Arc<Storage<C>>,
    broker: QuestionBroker<C>,
}

pub struct Engine<C: Clock + 'static> {
    config: EngineConfig,
    clock: C,
    lsp: LspManager<C>,
    indexer: Indexer<C>,
    /// Database and broker open lazily; the broker shares the storage
    /// handle so resolvers live in exactly one table.
    persistence: Mutex<Option<Arc<Persistence<C>>>>,
}

impl<C: Clock + 'static> Engine<C> {
    pub fn new(config: EngineConfig, clock: C) -> Self {
        let lsp = LspManager::new(config.project_dir.clone(), Registry::builtin(), clock.clone());
        let indexer = Indexer::new(config.index.clone(), clock.clone());
        Self { config, clock, lsp, indexer, persistence: Mutex::new(None) }
    }

    pub fn project_dir(&self) -> &PathBuf {
        &self.config.project_dir
    }

    pub fn lsp(&self) -> &LspManager<C> {
        &self.lsp
    }

    pub fn indexer(&self) -> &Indexer<C> {
        &self.indexer
    }

    /// Snapshot operations for this engine's project.
    pub fn snapshots(&self) -> Snapshots<C> {
        Snapshots::new(self.config.project_dir.clone(), self.clock.clone())
    }

    /// The storage handle, opened on first use.
    pub fn storage(&self) -> Result<Arc<Storage<C>>, StorageError> {
        Ok(self.persistence()?.storage.clone())
    }

    /// The question broker, sharing the lazily-opened storage.
    pub fn questions(&self) -> Result<QuestionBroker<C>, StorageError> {
        Ok(self.persistence()?.broker.clone())
    }

    fn persistence(&self) -> Result<Arc<Persistence<C>>, StorageError> {
        let mut guard = self.persistence.lock();
        if let Some(existing) = guard.as_ref() {
            return Ok(existing.clone());
        }
        let storage = Arc::new(match &self.config.db_path {
            Some(path) => Storage::open(path, self.clock.clone())?,
            None => Storage::open_default(self.clock.clone())?,
        });
        let broker = QuestionBroker::new(storage.clone());
        let persistence = Arc::new(Persistence { storage, broker });
        *guard = Some(persistence.clone());
        tracing::debug!("persistence layer opened");
        Ok(persistence)
    }

    /// Context handed to a tool invocation.
    pub fn tool_context(&self, session_id: SessionId) -> ToolContext {
        ToolContext::new(session_id, self.config.project_dir.clone())
    }

    /// Stop every supervised child. Call once, when the host shuts down;
    /// orphaned language servers are a bug.
    pub async fn shutdown(&self) {
        self.lsp.stop_all().await;
        tracing::debug!("engine shut down");
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
