//! API documentation pipeline.
//!
//! For each platform folder, markdown guides under `{platform}/api-docs/` and JSON specs under
//! `{platform}/api-specs/` are chunked file by file. Every chunk gets its own random id.

use super::{PipelineContext, PipelineError, RunSummary, files_with_extension};
use crate::document::{ChunkDocument, Document, generate_id};
use crate::indexer::DEFAULT_BATCH_SIZE;
use std::path::Path;

/// Source folders scanned in each platform directory: (folder, file extension, `doc_type`).
const SOURCES: [(&str, &str, &str); 2] = [
    ("api-docs", "md", "api-docs"),
    ("api-specs", "json", "api-specs"),
];

/// Chunk, embed and upload the API docs of every platform into `index_name`.
pub async fn run(
    ctx: &PipelineContext,
    index_name: &str,
    platforms: &[String],
) -> Result<RunSummary, PipelineError> {
    tracing::info!(index = index_name, ?platforms, "Processing API docs");
    let indexer = ctx.open_index(index_name).await?;

    let mut documents = Vec::new();
    for platform in platforms {
        let platform_dir = ctx.source_path(platform);
        for (folder, extension, doc_type) in SOURCES {
            for path in files_with_extension(&platform_dir.join(folder), extension) {
                let chunks = file_documents(ctx, &path, platform, doc_type)?;
                tracing::debug!(
                    path = %path.display(),
                    platform = %platform,
                    chunks = chunks.len(),
                    "Chunked source file"
                );
                documents.extend(chunks);
            }
        }
    }

    ctx.embed_and_upload(&indexer, documents, 0, DEFAULT_BATCH_SIZE)
        .await
}

fn file_documents(
    ctx: &PipelineContext,
    path: &Path,
    platform: &str,
    doc_type: &str,
) -> Result<Vec<Document>, PipelineError> {
    let documents = ctx
        .chunker
        .chunk_file(path)?
        .into_iter()
        .map(|chunk| {
            Document::from(ChunkDocument {
                id: generate_id(),
                content: chunk,
                platform: platform.to_string(),
                doc_type: doc_type.to_string(),
                embedding: Vec::new(),
            })
        })
        .collect();
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn indexes_docs_then_specs_per_platform() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_file(dir.path(), "meraki/api-docs/b.md", "# Devices\nList devices.");
        write_file(dir.path(), "meraki/api-docs/a.md", "# Networks\nList networks.");
        write_file(dir.path(), "meraki/api-docs/notes.txt", "ignored");
        write_file(dir.path(), "meraki/api-specs/openapi.json", r#"{"openapi":"3.0.0"}"#);
        write_file(dir.path(), "webex/api-specs/rooms.json", r#"{"paths":{}}"#);

        let backend = Arc::new(MemoryBackend::default());
        let embedder = Arc::new(CountingEmbedder::new(TEST_DIMENSION));
        let ctx = context(dir.path(), backend.clone(), embedder);

        let platforms = vec![
            "catalyst_center".to_string(),
            "meraki".to_string(),
            "webex".to_string(),
        ];
        let summary = run(&ctx, "api-docs-index", &platforms).await.expect("run");
        assert_eq!(summary.documents, 4);
        assert_eq!(summary.skipped, 0);

        let uploaded = backend.documents();
        let rows: Vec<(String, String, String)> = uploaded
            .iter()
            .map(|doc| match doc {
                Document::Chunk(chunk) => (
                    chunk.platform.clone(),
                    chunk.doc_type.clone(),
                    chunk.content.clone(),
                ),
                other => panic!("unexpected document {other:?}"),
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                ("meraki".into(), "api-docs".into(), "# Networks\nList networks.".into()),
                ("meraki".into(), "api-docs".into(), "# Devices\nList devices.".into()),
                ("meraki".into(), "api-specs".into(), r#"{"openapi":"3.0.0"}"#.into()),
                ("webex".into(), "api-specs".into(), r#"{"paths":{}}"#.into()),
            ]
        );

        let ids: HashSet<&str> = uploaded.iter().map(Document::id).collect();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn no_platform_folders_uploads_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = Arc::new(MemoryBackend::default());
        let ctx = context(
            dir.path(),
            backend.clone(),
            Arc::new(CountingEmbedder::new(TEST_DIMENSION)),
        );

        let summary = run(&ctx, "api-docs-index", &["meraki".to_string()])
            .await
            .expect("run");
        assert_eq!(summary.documents, 0);
        assert_eq!(summary.batches, 0);
        assert!(backend.batches.lock().unwrap().is_empty());
        assert_eq!(*backend.created.lock().unwrap(), vec!["api-docs-index"]);
    }
}
