// SPDX-License-Identifier: MIT

//! Client for a local embedding server.
//!
//! Wire shape: `POST /api/embeddings` with `{model, prompt}` returns
//! `{embedding: [..]}`; `GET /api/tags` lists `{models: [{name}]}`.

use crate::error::IndexError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    config: EmbeddingConfig,
}

impl EmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Embed one text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let endpoint = format!("{}/api/embeddings", self.config.base_url);
        let response = self
            .http
            .post(&endpoint)
            .json(&EmbeddingRequest { model: &self.config.model, prompt: text })
            .send()
            .await
            .map_err(|err| IndexError::request(&endpoint, err))?;

        if !response.status().is_success() {
            return Err(IndexError::from_response(&endpoint, &response));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| IndexError::malformed(&endpoint, err.to_string()))?;
        Ok(parsed.embedding)
    }

    /// Embed several texts with sequential calls; the local server is
    /// treated as externally serialised.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Whether the server answers at all. Swallows errors into `false`.
    pub async fn is_available(&self) -> bool {
        self.list_tags().await.is_ok()
    }

    /// Whether the configured model appears in the tag listing, by
    /// substring. Swallows errors into `false`.
    pub async fn has_model(&self) -> bool {
        match self.list_tags().await {
            Ok(tags) => tags.models.iter().any(|m| m.name.contains(&self.config.model)),
            Err(_) => false,
        }
    }

    /// Dimension of the configured model, measured with a probe embedding.
    pub async fn get_dimension(&self) -> Result<usize, IndexError> {
        Ok(self.embed("dimension probe").await?.len())
    }

    async fn list_tags(&self) -> Result<TagsResponse, IndexError> {
        let endpoint = format!("{}/api/tags", self.config.base_url);
        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|err| IndexError::request(&endpoint, err))?;
        if !response.status().is_success() {
            return Err(IndexError::from_response(&endpoint, &response));
        }
        response
            .json()
            .await
            .map_err(|err| IndexError::malformed(&endpoint, err.to_string()))
    }
}

#[cfg(test)]
#[path = "embedding_tests.rs"]
mod tests;
