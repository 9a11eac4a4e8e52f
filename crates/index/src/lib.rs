// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hew-index: semantic code indexing.
//!
//! Walks a project tree, chunks source files on line boundaries with
//! overlap, embeds each chunk through a local embedding server, and
//! upserts deterministic-ID points into a vector store. Queries embed
//! once and run cosine-similarity search. Both backends are plain HTTP
//! services; nothing here implements a model or a database.

mod chunk;
mod embedding;
mod error;
mod indexer;
mod store;
mod walk;

#[cfg(test)]
pub(crate) mod test_http;

pub use chunk::{chunk_lines, ChunkOptions, FileChunk};
pub use embedding::{EmbeddingClient, EmbeddingConfig};
pub use error::IndexError;
pub use indexer::{Indexer, IndexerConfig, IndexStats};
pub use store::{point_uuid, CollectionInfo, SearchHit, UpsertPoint, VectorStoreClient, VectorStoreConfig};
pub use walk::{walk_source_files, Glob, GlobCache};
