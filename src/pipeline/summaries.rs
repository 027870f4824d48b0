//! Domain summaries pipeline.
//!
//! Source: `domain_summaries/domain_summaries.json`, an array of objects with `id`, `content`,
//! `platform` and `doc_type`. Each summary is chunked and every chunk becomes one document that
//! keeps the summary's `id`.

use super::{PipelineContext, PipelineError, RunSummary, read_json, truthy_text};
use crate::chunking::Chunker;
use crate::document::{ChunkDocument, Document, generate_id};
use crate::indexer::DEFAULT_BATCH_SIZE;
use serde_json::Value;

/// Location of the summaries file under the data directory.
pub const SOURCE_FILE: &str = "domain_summaries/domain_summaries.json";

const UNKNOWN: &str = "unknown";

/// Chunk, embed and upload every domain summary into `index_name`.
pub async fn run(ctx: &PipelineContext, index_name: &str) -> Result<RunSummary, PipelineError> {
    tracing::info!(index = index_name, "Processing domain summaries");
    let indexer = ctx.open_index(index_name).await?;

    let path = ctx.source_path(SOURCE_FILE);
    let records = match read_json(&path)? {
        Value::Array(records) => records,
        other => vec![other],
    };

    let mut skipped = 0;
    let mut documents = Vec::new();
    for record in &records {
        match summary_documents(record, &ctx.chunker) {
            Some(chunks) => documents.extend(chunks),
            None => {
                tracing::warn!(record = %record, "Summary has no 'content'; skipping");
                ctx.skip(&mut skipped);
            }
        }
    }

    ctx.embed_and_upload(&indexer, documents, skipped, DEFAULT_BATCH_SIZE)
        .await
}

/// Documents for one summary record, or `None` when it has no usable `content`.
///
/// All chunks share the record's `id`; a record without one gets a single generated id.
pub fn summary_documents(record: &Value, chunker: &Chunker) -> Option<Vec<Document>> {
    let content = record.get("content")?.as_str()?;

    let id = truthy_text(record.get("id")).unwrap_or_else(generate_id);
    let platform = truthy_text(record.get("platform")).unwrap_or_else(|| UNKNOWN.to_string());
    let doc_type = truthy_text(record.get("doc_type")).unwrap_or_else(|| UNKNOWN.to_string());

    let documents = chunker
        .chunk_text(content)
        .into_iter()
        .map(|chunk| {
            Document::from(ChunkDocument {
                id: id.clone(),
                content: chunk,
                platform: platform.clone(),
                doc_type: doc_type.clone(),
                embedding: Vec::new(),
            })
        })
        .collect();
    Some(documents)
}
