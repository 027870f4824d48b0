//! Line-of-business pipeline.
//!
//! Every `*.json` file in `lob_samples/{folder}/` holds either a list of records or a single
//! record. Records are embedded whole: `content` joins the record's top-level string values and
//! `metadata` keeps the full record as JSON text.

use super::{PipelineContext, PipelineError, RunSummary, files_with_extension, truthy_text};
use crate::document::{Document, LobDocument, generate_id};
use serde_json::{Map, Value};
use std::path::Path;

/// Directory under the data directory holding one folder per line of business.
pub const SAMPLES_DIR: &str = "lob_samples";

/// Default upload batch size for line-of-business records.
pub const LOB_BATCH_SIZE: usize = 100;

const EXCLUDED_KEYS: [&str; 2] = ["id", "embedding"];

/// Embed and upload the records in `lob_samples/{folder}` into `index_name`.
pub async fn run(
    ctx: &PipelineContext,
    index_name: &str,
    folder: &str,
) -> Result<RunSummary, PipelineError> {
    tracing::info!(index = index_name, folder, "Processing line-of-business records");
    let indexer = ctx.open_index(index_name).await?;

    let dir = ctx.source_path(Path::new(SAMPLES_DIR).join(folder));
    if !dir.is_dir() {
        tracing::warn!(path = %dir.display(), "No line-of-business directory found");
        return Ok(RunSummary::empty(index_name, 0));
    }

    let files = files_with_extension(&dir, "json");
    if files.is_empty() {
        tracing::warn!(path = %dir.display(), "No .json files found");
        return Ok(RunSummary::empty(index_name, 0));
    }

    let mut skipped = 0;
    let mut records = Vec::new();
    for path in &files {
        tracing::debug!(path = %path.display(), "Reading records");
        match load_records(path) {
            Ok(mut loaded) => records.append(&mut loaded),
            Err(reason) => {
                tracing::warn!(path = %path.display(), reason = %reason, "Skipping file");
                ctx.skip(&mut skipped);
            }
        }
    }

    if records.is_empty() {
        tracing::warn!(path = %dir.display(), "No valid records found");
        return Ok(RunSummary::empty(index_name, skipped));
    }

    let documents = records
        .iter()
        .map(|record| Document::from(lob_document(record)))
        .collect();
    ctx.embed_and_upload(&indexer, documents, skipped, LOB_BATCH_SIZE)
        .await
}

/// Records of one file: a list of objects or a single object.
///
/// Non-object list entries are dropped. The error explains why a whole file was unusable.
fn load_records(path: &Path) -> Result<Vec<Map<String, Value>>, String> {
    let raw = std::fs::read_to_string(path).map_err(|err| err.to_string())?;
    match serde_json::from_str::<Value>(&raw).map_err(|err| err.to_string())? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                other => {
                    tracing::warn!(path = %path.display(), item = %other, "Ignoring non-object record");
                    None
                }
            })
            .collect()),
        Value::Object(record) => Ok(vec![record]),
        _ => Err("not a list or object".to_string()),
    }
}

/// Build the document for one record, with an empty embedding.
pub fn lob_document(record: &Map<String, Value>) -> LobDocument {
    let id = truthy_text(record.get("id")).unwrap_or_else(generate_id);
    let content = record
        .iter()
        .filter(|(key, _)| !EXCLUDED_KEYS.contains(&key.to_lowercase().as_str()))
        .filter_map(|(_, value)| value.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let metadata = Value::Object(record.clone()).to_string();

    LobDocument {
        id,
        content,
        embedding: Vec::new(),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::*;
    use serde_json::json;
    use std::sync::Arc;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn content_joins_string_fields_in_source_order() {
        let record = object(json!({
            "ID": "ignored",
            "name": "Jane Doe",
            "age": 42,
            "notes": "Allergic to penicillin",
            "Embedding": "ignored too",
            "ward": "Cardiology",
            "tags": ["a"]
        }));
        let doc = lob_document(&record);
        assert_eq!(doc.content, "Jane Doe\nAllergic to penicillin\nCardiology");
        assert!(uuid::Uuid::parse_str(&doc.id).is_ok());

        let metadata: Value = serde_json::from_str(&doc.metadata).expect("metadata");
        assert_eq!(metadata, Value::Object(record));
    }

    #[test]
    fn record_id_is_stringified() {
        assert_eq!(lob_document(&object(json!({ "id": "p-1" }))).id, "p-1");
        assert_eq!(lob_document(&object(json!({ "id": 17 }))).id, "17");
    }

    #[tokio::test]
    async fn run_merges_files_and_skips_unusable_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_file(
            dir.path(),
            "lob_samples/healthcare/a_patients.json",
            &json!([{ "id": "p1", "name": "Ann" }, { "id": "p2", "name": "Bo" }]).to_string(),
        );
        write_file(
            dir.path(),
            "lob_samples/healthcare/b_single.json",
            &json!({ "id": "p3", "name": "Cy" }).to_string(),
        );
        write_file(dir.path(), "lob_samples/healthcare/c_scalar.json", "42");
        write_file(dir.path(), "lob_samples/healthcare/d_broken.json", "[{");

        let backend = Arc::new(MemoryBackend::default());
        let embedder = Arc::new(CountingEmbedder::new(TEST_DIMENSION));
        let mut ctx = context(dir.path(), backend.clone(), embedder);
        ctx.batch_size = Some(2);

        let summary = run(&ctx, "lob-healthcare", "healthcare").await.expect("run");
        assert_eq!(
            summary,
            RunSummary {
                index_name: "lob-healthcare".into(),
                documents: 3,
                batches: 2,
                skipped: 2,
                embeddings: 3,
            }
        );
        let ids: Vec<String> = backend
            .documents()
            .iter()
            .map(|doc| doc.id().to_string())
            .collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn missing_folder_finishes_without_upload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = Arc::new(MemoryBackend::default());
        let embedder = Arc::new(CountingEmbedder::new(TEST_DIMENSION));
        let ctx = context(dir.path(), backend.clone(), embedder.clone());

        let summary = run(&ctx, "lob-retail", "retail").await.expect("run");
        assert_eq!(summary, RunSummary::empty("lob-retail", 0));
        assert!(backend.batches.lock().unwrap().is_empty());
        assert_eq!(embedder.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn folder_without_records_finishes_without_upload() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_file(dir.path(), "lob_samples/retail/empty.json", "[]");
        let backend = Arc::new(MemoryBackend::default());
        let ctx = context(
            dir.path(),
            backend.clone(),
            Arc::new(CountingEmbedder::new(TEST_DIMENSION)),
        );

        let summary = run(&ctx, "lob-retail", "retail").await.expect("run");
        assert_eq!(summary.documents, 0);
        assert!(backend.batches.lock().unwrap().is_empty());
    }
}
