//! Shared types used by the indexer and its backends.

use crate::config::ConfigError;
use crate::schema::SchemaError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors returned while creating indexes or uploading documents.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Index name has no schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Backend settings were incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Base URL failed to parse or normalize.
    #[error("Invalid search endpoint: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Backend responded with an unexpected status code.
    #[error("Unexpected search service response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Backend accepted the request but rejected some documents.
    #[error("{} document(s) rejected by the search service: {}", .failures.len(), summarize(.failures))]
    Rejected {
        /// Per-document failures reported by the backend.
        failures: Vec<DocumentFailure>,
    },
    /// A document's vector does not match the index's vector dimension.
    #[error("Document '{id}' has an embedding of length {actual}, index expects {expected}")]
    DimensionMismatch {
        /// Offending document key.
        id: String,
        /// Dimension configured on the index.
        expected: usize,
        /// Length of the document's vector.
        actual: usize,
    },
    /// Upload requested with an empty batch size.
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
}

/// Failure reported for one document of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFailure {
    /// Document key.
    pub key: String,
    /// Backend-provided reason.
    #[serde(default)]
    pub error_message: Option<String>,
}

fn summarize(failures: &[DocumentFailure]) -> String {
    failures
        .iter()
        .map(|failure| match &failure.error_message {
            Some(message) => format!("{} ({message})", failure.key),
            None => failure.key.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of [`crate::indexer::Indexer::create_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// The index was missing and has been created.
    Created,
    /// The index already existed and was left untouched.
    AlreadyExists,
}

/// Summary of a completed upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Documents uploaded.
    pub documents: usize,
    /// Backend calls issued.
    pub batches: usize,
}

#[derive(Deserialize)]
pub(crate) struct IndexingResponse {
    #[serde(default)]
    pub(crate) value: Vec<IndexingResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IndexingResult {
    pub(crate) key: String,
    pub(crate) status: bool,
    #[serde(default)]
    pub(crate) error_message: Option<String>,
}
