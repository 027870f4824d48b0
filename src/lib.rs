#![deny(missing_docs)]

//! Core library for the domain-index ingestion tool.

/// Size-bounded, overlapping text chunking.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Documents uploaded to the search indexes.
pub mod document;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Index creation and batched upload.
pub mod indexer;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Source-specific ingestion pipelines.
pub mod pipeline;
/// Index schema definitions.
pub mod schema;
