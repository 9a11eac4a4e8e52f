// SPDX-License-Identifier: MIT

//! Client for the vector store's REST surface.
//!
//! Collections live under `/collections/<name>`, points under
//! `/points`, nearest-neighbour search under `/points/search`. Point ids
//! are derived UUIDs so the store can be wiped and re-indexed without the
//! ids drifting.

use crate::chunk::FileChunk;
use crate::error::IndexError;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub base_url: String,
    pub collection: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:6333".to_string(),
            collection: "hew-code".to_string(),
        }
    }
}

/// One point to upsert: the logical chunk id, its vector, and the chunk
/// carried as payload.
#[derive(Debug, Clone)]
pub struct UpsertPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: FileChunk,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: FileChunk,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectionInfo {
    pub points_count: u64,
    pub vector_size: u64,
}

/// Deterministic UUID for a logical point id: same input, same UUID,
/// forever. The store requires UUID point ids; we require stability
/// across re-indexing.
pub fn point_uuid(id: &str) -> String {
    let digest = Sha256::digest(id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    uuid::Uuid::from_bytes(bytes).to_string()
}

#[derive(Debug, Clone)]
pub struct VectorStoreClient {
    http: reqwest::Client,
    config: VectorStoreConfig,
}

impl VectorStoreClient {
    pub fn new(config: VectorStoreConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.config.base_url, self.config.collection)
    }

    /// Ensure the collection exists with the given dimension, creating it
    /// with cosine distance when absent. Creation failure surfaces.
    pub async fn init_collection(&self, dim: usize) -> Result<(), IndexError> {
        let endpoint = self.collection_url();
        let probe = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|err| IndexError::request(&endpoint, err))?;
        if probe.status().is_success() {
            return Ok(());
        }

        let response = self
            .http
            .put(&endpoint)
            .json(&json!({
                "vectors": { "size": dim, "distance": "Cosine" }
            }))
            .send()
            .await
            .map_err(|err| IndexError::request(&endpoint, err))?;
        if !response.status().is_success() {
            return Err(IndexError::from_response(&endpoint, &response));
        }
        tracing::info!(collection = %self.config.collection, dim, "created vector collection");
        Ok(())
    }

    /// Upsert points. The payload stores the original logical id next to
    /// the chunk fields.
    pub async fn upsert(&self, points: &[UpsertPoint]) -> Result<(), IndexError> {
        if points.is_empty() {
            return Ok(());
        }
        let endpoint = format!("{}/points", self.collection_url());
        let body: Vec<serde_json::Value> = points
            .iter()
            .map(|point| {
                json!({
                    "id": point_uuid(&point.id),
                    "vector": point.vector,
                    "payload": point.chunk,
                })
            })
            .collect();

        let response = self
            .http
            .put(&endpoint)
            .json(&json!({ "points": body }))
            .send()
            .await
            .map_err(|err| IndexError::request(&endpoint, err))?;
        if !response.status().is_success() {
            return Err(IndexError::from_response(&endpoint, &response));
        }
        Ok(())
    }

    /// Nearest-neighbour search; hits come back with their payloads
    /// rehydrated into chunks.
    pub async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchHit>, IndexError> {
        #[derive(Deserialize)]
        struct SearchResponse {
            #[serde(default)]
            result: Vec<RawHit>,
        }
        #[derive(Deserialize)]
        struct RawHit {
            score: f32,
            payload: Option<FileChunk>,
        }

        let endpoint = format!("{}/points/search", self.collection_url());
        let response = self
            .http
            .post(&endpoint)
            .json(&json!({
                "vector": vector,
                "limit": limit,
                "with_payload": true
            }))
            .send()
            .await
            .map_err(|err| IndexError::request(&endpoint, err))?;
        if !response.status().is_success() {
            return Err(IndexError::from_response(&endpoint, &response));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|err| IndexError::malformed(&endpoint, err.to_string()))?;
        Ok(parsed
            .result
            .into_iter()
            .filter_map(|hit| hit.payload.map(|chunk| SearchHit { chunk, score: hit.score }))
            .collect())
    }

    /// Delete every point whose payload matches the file path exactly.
    pub async fn delete_by_file_path(&self, file_path: &str) -> Result<(), IndexError> {
        let endpoint = format!("{}/points/delete", self.collection_url());
        let response = self
            .http
            .post(&endpoint)
            .json(&json!({
                "filter": {
                    "must": [{ "key": "filePath", "match": { "value": file_path } }]
                }
            }))
            .send()
            .await
            .map_err(|err| IndexError::request(&endpoint, err))?;
        if !response.status().is_success() {
            return Err(IndexError::from_response(&endpoint, &response));
        }
        Ok(())
    }

    /// Drop the whole collection; absence is fine.
    pub async fn clear_collection(&self) -> Result<(), IndexError> {
        let endpoint = self.collection_url();
        let response = self
            .http
            .delete(&endpoint)
            .send()
            .await
            .map_err(|err| IndexError::request(&endpoint, err))?;
        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(IndexError::from_response(&endpoint, &response));
        }
        Ok(())
    }

    /// Point count and vector size, or `None` on any failure.
    pub async fn get_collection_info(&self) -> Option<CollectionInfo> {
        let endpoint = self.collection_url();
        let response = self.http.get(&endpoint).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body: serde_json::Value = response.json().await.ok()?;
        let result = body.get("result")?;
        Some(CollectionInfo {
            points_count: result.get("points_count")?.as_u64()?,
            vector_size: result
                .pointer("/config/params/vectors/size")?
                .as_u64()?,
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
