// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    /// Non-2xx from the embedding or vector endpoints, with the status
    /// line the server sent.
    #[error("{endpoint} returned {status} {status_text}")]
    Http {
        endpoint: String,
        status: u16,
        status_text: String,
    },

    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {endpoint}: {detail}")]
    Malformed { endpoint: String, detail: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("indexing cancelled")]
    Cancelled,
}

impl IndexError {
    pub(crate) fn from_response(endpoint: &str, response: &reqwest::Response) -> Self {
        Self::Http {
            endpoint: endpoint.to_string(),
            status: response.status().as_u16(),
            status_text: response
                .status()
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string(),
        }
    }

    pub(crate) fn request(endpoint: &str, source: reqwest::Error) -> Self {
        Self::Request { endpoint: endpoint.to_string(), source }
    }

    pub(crate) fn malformed(endpoint: &str, detail: impl Into<String>) -> Self {
        Self::Malformed { endpoint: endpoint.to_string(), detail: detail.into() }
    }
}
