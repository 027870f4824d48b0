use std::sync::atomic::{AtomicU64, Ordering};

/// Run-scoped counters describing ingestion activity.
///
/// The counter is owned by whoever drives a pipeline run and handed to the pipeline by
/// reference; nothing in the crate keeps process-wide ingestion state.
#[derive(Default)]
pub struct IngestMetrics {
    embeddings_requested: AtomicU64,
    documents_built: AtomicU64,
    records_skipped: AtomicU64,
    batches_uploaded: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one embedding request and return its 1-based sequence number.
    pub fn record_embedding(&self) -> u64 {
        self.embeddings_requested.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record documents assembled for upload.
    pub fn record_documents(&self, count: u64) {
        self.documents_built.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a source record that was skipped.
    pub fn record_skipped(&self) {
        self.records_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record uploaded batches.
    pub fn record_batches(&self, count: u64) {
        self.batches_uploaded.fetch_add(count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            embeddings_requested: self.embeddings_requested.load(Ordering::Relaxed),
            documents_built: self.documents_built.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            batches_uploaded: self.batches_uploaded.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Embedding calls issued (retries of one call count once).
    pub embeddings_requested: u64,
    /// Documents assembled for upload.
    pub documents_built: u64,
    /// Source records skipped because they were unusable.
    pub records_skipped: u64,
    /// Upload batches accepted by the backend.
    pub batches_uploaded: u64,
}
