// SPDX-License-Identifier: MIT

//! The indexing pipeline: walk, chunk, embed, upsert; query by embedding
//! once and delegating to the store.

use crate::chunk::{chunk_lines, ChunkOptions};
use crate::embedding::{EmbeddingClient, EmbeddingConfig};
use crate::error::IndexError;
use crate::store::{SearchHit, UpsertPoint, VectorStoreClient, VectorStoreConfig};
use crate::walk::walk_source_files;
use hew_core::Clock;
use std::path::Path;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct IndexerConfig {
    pub embedding: EmbeddingConfig,
    pub store: VectorStoreConfig,
    pub chunking: ChunkOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub files_indexed: usize,
    pub chunks_created: usize,
    pub duration_ms: u64,
}

/// Progress callback: invoked with each file before it is processed.
pub type Progress<'a> = &'a (dyn Fn(&Path) + Send + Sync);

pub struct Indexer<C: Clock> {
    embedding: EmbeddingClient,
    store: VectorStoreClient,
    chunking: ChunkOptions,
    clock: C,
    /// Dimension probe + collection creation happen once, on first use.
    initialized: OnceCell<usize>,
}

impl<C: Clock> Indexer<C> {
    pub fn new(config: IndexerConfig, clock: C) -> Self {
        Self {
            embedding: EmbeddingClient::new(config.embedding),
            store: VectorStoreClient::new(config.store),
            chunking: config.chunking,
            clock,
            initialized: OnceCell::new(),
        }
    }

    pub fn embedding_client(&self) -> &EmbeddingClient {
        &self.embedding
    }

    pub fn store_client(&self) -> &VectorStoreClient {
        &self.store
    }

    /// Walk the project and (re)index every accepted source file.
    ///
    /// Per-file failures are logged and skipped; the pipeline keeps
    /// going. Cancellation is observed between chunks.
    pub async fn index_all(
        &self,
        project_dir: &Path,
        cancel: &CancellationToken,
        progress: Option<Progress<'_>>,
    ) -> Result<IndexStats, IndexError> {
        let started = self.clock.now();
        self.ensure_initialized().await?;

        let files = walk_source_files(project_dir);
        let mut files_indexed = 0usize;
        let mut chunks_created = 0usize;

        for file in &files {
            if cancel.is_cancelled() {
                return Err(IndexError::Cancelled);
            }
            if let Some(progress) = progress {
                progress(file);
            }
            match self.index_file(project_dir, file, cancel).await {
                Ok(count) => {
                    files_indexed += 1;
                    chunks_created += count;
                }
                Err(IndexError::Cancelled) => return Err(IndexError::Cancelled),
                Err(err) => {
                    tracing::warn!(file = %file.display(), error = %err, "skipping file");
                }
            }
        }

        let duration_ms = self.clock.now().saturating_duration_since(started).as_millis() as u64;
        tracing::info!(files_indexed, chunks_created, duration_ms, "index pass complete");
        Ok(IndexStats { files_indexed, chunks_created, duration_ms })
    }

    /// Embed the query once and run similarity search.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, IndexError> {
        self.ensure_initialized().await?;
        let vector = self.embedding.embed(query).await?;
        self.store.search(&vector, limit).await
    }

    async fn ensure_initialized(&self) -> Result<usize, IndexError> {
        self.initialized
            .get_or_try_init(|| async {
                let dim = self.embedding.get_dimension().await?;
                self.store.init_collection(dim).await?;
                Ok(dim)
            })
            .await
            .copied()
    }

    async fn index_file(
        &self,
        project_dir: &Path,
        file: &Path,
        cancel: &CancellationToken,
    ) -> Result<usize, IndexError> {
        let text = tokio::fs::read_to_string(file)
            .await
            .map_err(|err| IndexError::Io { path: file.to_path_buf(), source: err })?;
        if text.trim().is_empty() {
            return Ok(0);
        }

        let relative = file.strip_prefix(project_dir).unwrap_or(file);
        let file_path = relative.to_string_lossy().into_owned();
        let language = language_for_extension(file);
        let chunks = chunk_lines(
            &file_path,
            language,
            &text,
            self.chunking,
            self.clock.epoch_ms(),
        );

        let mut points = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if cancel.is_cancelled() {
                return Err(IndexError::Cancelled);
            }
            let vector = self.embedding.embed(&chunk.text).await?;
            points.push(UpsertPoint { id: chunk.id.clone(), vector, chunk });
        }

        let count = points.len();
        self.store.upsert(&points).await?;
        Ok(count)
    }
}

fn language_for_extension(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "ts" | "tsx" | "mts" | "cts" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "rb" => "ruby",
        "php" => "php",
        "c" | "h" => "c",
        "cpp" | "hpp" => "cpp",
        "cs" => "csharp",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "sh" => "shell",
        "sql" => "sql",
        "html" => "html",
        "css" => "css",
        "vue" => "vue",
        "svelte" => "svelte",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "md" => "markdown",
        _ => "text",
    }
}

#[cfg(test)]
#[path = "indexer_tests.rs"]
mod tests;
