//! Ingestion pipelines: load source records, embed them and upload them to one index.
//!
//! Every pipeline follows the same sequence. The target index is created if missing, source
//! records are read from the data directory and turned into [`Document`]s with empty vectors,
//! each document's `content` is embedded, and the whole set is handed to the [`Indexer`] for
//! batched upload. [`PipelineContext`] carries the collaborators so the pipelines never touch
//! process-wide state.

use crate::{
    chunking::{Chunker, ChunkingError},
    config::{Config, ConfigError},
    document::Document,
    embedding::{EmbeddingClient, EmbeddingClientError},
    indexer::{Indexer, IndexerError, SearchBackend, UploadSummary},
    metrics::IngestMetrics,
};
use futures_util::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

pub mod api_docs;
pub mod events;
pub mod lob;
pub mod summaries;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Settings were missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Chunking options were invalid or a source file could not be chunked.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// The embedding provider failed after retries.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Index creation or upload failed.
    #[error("Indexing failed: {0}")]
    Indexer(#[from] IndexerError),
    /// A required source file could not be read.
    #[error("failed to read {path}: {source}")]
    Source {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A required source file was not valid JSON.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Index the documents were written to.
    pub index_name: String,
    /// Documents uploaded.
    pub documents: usize,
    /// Upload calls issued.
    pub batches: usize,
    /// Source records skipped as unusable.
    pub skipped: u64,
    /// Embedding calls issued.
    pub embeddings: usize,
}

impl RunSummary {
    fn empty(index_name: &str, skipped: u64) -> Self {
        Self {
            index_name: index_name.to_string(),
            documents: 0,
            batches: 0,
            skipped,
            embeddings: 0,
        }
    }
}

/// Collaborators shared by every pipeline run.
pub struct PipelineContext {
    /// Search service receiving the documents.
    pub backend: Arc<dyn SearchBackend>,
    /// Provider used to embed document content.
    pub embedder: Arc<dyn EmbeddingClient>,
    /// Splitter used by the chunked pipelines.
    pub chunker: Chunker,
    /// Caller-owned run counters.
    pub metrics: Arc<IngestMetrics>,
    /// Root of the source data layout.
    pub data_dir: PathBuf,
    /// Vector dimension of every index schema.
    pub dimension: usize,
    /// Embedding requests allowed in flight at once.
    pub concurrency: usize,
    /// Batch size overriding each pipeline's default.
    pub batch_size: Option<usize>,
}

impl PipelineContext {
    /// Assemble a context from configuration and the already-built clients.
    pub fn from_config(
        config: &Config,
        backend: Arc<dyn SearchBackend>,
        embedder: Arc<dyn EmbeddingClient>,
        metrics: Arc<IngestMetrics>,
    ) -> Result<Self, PipelineError> {
        let chunker = Chunker::new(config.chunking_options())?;
        let options = chunker.options();
        tracing::debug!(
            chunk_size = options.chunk_size,
            chunk_overlap = options.chunk_overlap,
            unit = ?options.unit,
            concurrency = config.embedding_concurrency,
            "Pipeline context ready"
        );
        Ok(Self {
            backend,
            embedder,
            chunker,
            metrics,
            data_dir: config.data_dir.clone(),
            dimension: config.embedding_dimension,
            concurrency: config.embedding_concurrency,
            batch_size: config.upload_batch_size,
        })
    }

    /// Resolve `relative` under the data directory.
    pub fn source_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.data_dir.join(relative)
    }

    /// Build the indexer for `index_name` and make sure the index exists.
    pub(crate) async fn open_index(&self, index_name: &str) -> Result<Indexer, PipelineError> {
        let indexer = Indexer::new(self.backend.clone(), index_name, self.dimension)?;
        indexer.create_index().await?;
        Ok(indexer)
    }

    /// Embed every document's content in place, preserving document order.
    pub(crate) async fn embed_documents(
        &self,
        documents: &mut [Document],
    ) -> Result<(), PipelineError> {
        let embedder = self.embedder.as_ref();
        let metrics = self.metrics.as_ref();

        let vectors: Vec<Vec<f32>> = stream::iter(documents.iter())
            .map(|document| async move {
                let sequence = metrics.record_embedding();
                tracing::debug!(sequence, id = document.id(), "Generating embedding");
                embedder.embed(document.content()).await
            })
            .buffered(self.concurrency.max(1))
            .try_collect()
            .await?;

        for (document, vector) in documents.iter_mut().zip(vectors) {
            *document.embedding_mut() = vector;
        }
        Ok(())
    }

    /// Embed and upload `documents`, returning the run summary.
    pub(crate) async fn embed_and_upload(
        &self,
        indexer: &Indexer,
        mut documents: Vec<Document>,
        skipped: u64,
        default_batch_size: usize,
    ) -> Result<RunSummary, PipelineError> {
        let index_name = indexer.index_name();
        tracing::info!(
            index = index_name,
            documents = documents.len(),
            "Generating embeddings"
        );
        self.embed_documents(&mut documents).await?;
        self.metrics.record_documents(documents.len() as u64);

        let batch_size = self.batch_size.unwrap_or(default_batch_size);
        let UploadSummary {
            documents: uploaded,
            batches,
        } = indexer.index_documents(&documents, batch_size).await?;
        self.metrics.record_batches(batches as u64);

        let summary = RunSummary {
            index_name: index_name.to_string(),
            documents: uploaded,
            batches,
            skipped,
            embeddings: documents.len(),
        };
        tracing::info!(
            index = %summary.index_name,
            documents = summary.documents,
            batches = summary.batches,
            skipped = summary.skipped,
            "Pipeline run complete"
        );
        Ok(summary)
    }

    pub(crate) fn skip(&self, skipped: &mut u64) {
        *skipped += 1;
        self.metrics.record_skipped();
    }
}

/// Run the domain summaries pipeline followed by the API docs pipeline.
pub async fn run_docs(
    ctx: &PipelineContext,
    summaries_index: &str,
    api_docs_index: &str,
    platforms: &[String],
) -> Result<Vec<RunSummary>, PipelineError> {
    let summaries = summaries::run(ctx, summaries_index).await?;
    let api_docs = api_docs::run(ctx, api_docs_index, platforms).await?;
    Ok(vec![summaries, api_docs])
}

/// Read and parse a JSON source file that the run cannot proceed without.
pub(crate) fn read_json(path: &Path) -> Result<Value, PipelineError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PipelineError::Source {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| PipelineError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Files directly inside `dir` with the given extension, in name order.
///
/// A missing directory yields no files.
pub(crate) fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        tracing::debug!(path = %dir.display(), "Source directory missing; skipping");
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .collect()
}

/// Text form of a JSON value, or `None` when the value is falsy.
///
/// Falsy values are `null`, `false`, `0`, the empty string and empty arrays or objects. Strings
/// come back unquoted; other values use their JSON text.
pub(crate) fn truthy_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other.to_string()),
    }
}
