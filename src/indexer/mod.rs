//! Index creation and batched document upload.
//!
//! [`Indexer`] owns the index name and schema and implements the backend-agnostic contract:
//! idempotent creation, dimension validation, and ordered batch upload that stops at the first
//! failed batch. Backends only provide the three remote primitives of [`SearchBackend`].

use crate::config::{Config, VectorBackend};
use crate::document::Document;
use crate::schema::{IndexSchema, build_index_schema};
use async_trait::async_trait;
use std::sync::Arc;

pub mod azure;
pub mod types;

pub use azure::AzureSearchBackend;
pub use types::{DocumentFailure, IndexStatus, IndexerError, UploadSummary};

/// Default number of documents per upload call.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Remote operations a search service must provide.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Report whether an index exists. Not-found is `Ok(false)`, not an error.
    async fn index_exists(&self, index_name: &str) -> Result<bool, IndexerError>;

    /// Create an index from its schema.
    async fn create_index(&self, schema: &IndexSchema) -> Result<(), IndexerError>;

    /// Upload one batch of documents in a single call.
    async fn upload_documents(
        &self,
        index_name: &str,
        documents: &[Document],
    ) -> Result<(), IndexerError>;
}

/// Build the backend selected by `VECTOR_BACKEND`.
pub fn create_backend(config: &Config) -> Result<Arc<dyn SearchBackend>, IndexerError> {
    match config.vector_backend {
        VectorBackend::Azure => Ok(Arc::new(AzureSearchBackend::from_config(config)?)),
    }
}

/// Connection to one index of a search backend.
pub struct Indexer {
    backend: Arc<dyn SearchBackend>,
    schema: IndexSchema,
}

impl Indexer {
    /// Resolve the schema for `index_name`; unknown names fail here, before any remote call.
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        index_name: &str,
        dimension: usize,
    ) -> Result<Self, IndexerError> {
        let schema = build_index_schema(index_name, dimension)?;
        Ok(Self { backend, schema })
    }

    /// Name of the target index.
    pub fn index_name(&self) -> &str {
        &self.schema.name
    }

    /// Create the index unless it already exists. Existing indexes are never modified.
    pub async fn create_index(&self) -> Result<IndexStatus, IndexerError> {
        let index = self.index_name();
        tracing::info!(index, "Attempting to create/reuse index");

        if self.backend.index_exists(index).await? {
            tracing::info!(index, "Index already exists; skipping creation");
            return Ok(IndexStatus::AlreadyExists);
        }

        tracing::info!(index, "Index does not exist; creating");
        self.backend
            .create_index(&self.schema)
            .await
            .inspect_err(|error| tracing::error!(index, error = %error, "Failed to create index"))?;
        tracing::info!(index, "Index created");
        Ok(IndexStatus::Created)
    }

    /// Upload `documents` in consecutive batches of at most `batch_size`.
    ///
    /// Every vector is checked against the schema dimension before the first call. A failed
    /// batch aborts the upload; batches already sent stay applied.
    pub async fn index_documents(
        &self,
        documents: &[Document],
        batch_size: usize,
    ) -> Result<UploadSummary, IndexerError> {
        if batch_size == 0 {
            return Err(IndexerError::InvalidBatchSize);
        }
        self.validate_dimensions(documents)?;

        let index = self.index_name();
        let total = documents.len();
        tracing::info!(index, total, batch_size, "Uploading documents");

        let mut batches = 0;
        for (position, batch) in documents.chunks(batch_size).enumerate() {
            let batch_number = position + 1;
            let sample = &batch[0];
            tracing::info!(
                index,
                batch = batch_number,
                size = batch.len(),
                sample_id = sample.id(),
                embedding_length = sample.embedding().len(),
                "Uploading batch"
            );

            self.backend
                .upload_documents(index, batch)
                .await
                .inspect_err(|error| {
                    tracing::error!(index, batch = batch_number, error = %error, "Batch upload failed")
                })?;
            batches += 1;
            tracing::debug!(index, batch = batch_number, "Batch upload completed");
        }

        tracing::info!(index, total, batches, "All documents uploaded");
        Ok(UploadSummary {
            documents: total,
            batches,
        })
    }

    fn validate_dimensions(&self, documents: &[Document]) -> Result<(), IndexerError> {
        let Some((_, expected)) = self.schema.vector_field() else {
            return Ok(());
        };
        match documents
            .iter()
            .find(|document| document.embedding().len() != expected)
        {
            Some(document) => Err(IndexerError::DimensionMismatch {
                id: document.id().to_string(),
                expected,
                actual: document.embedding().len(),
            }),
            None => Ok(()),
        }
    }
}
