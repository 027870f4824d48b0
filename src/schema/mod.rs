//! Index schemas for every logical index the pipelines write to.
//!
//! Index names resolve once into an [`IndexKind`]; each kind owns one schema constructor. The
//! three named indexes match exactly, while every `lob-` index shares the flexible
//! line-of-business schema.

use thiserror::Error;

pub mod types;

pub use types::{
    CorsOptions, FieldType, HnswParameters, IndexSchema, SearchField, SemanticConfiguration,
    SemanticSearch, VectorSearch,
};

/// Index that receives event records.
pub const EVENTS_INDEX: &str = "events-index";
/// Index that receives domain summaries.
pub const DOMAIN_SUMMARIES_INDEX: &str = "domain-summaries-index";
/// Index that receives API documentation.
pub const API_DOCS_INDEX: &str = "api-docs-index";
/// Prefix shared by line-of-business indexes.
pub const LOB_INDEX_PREFIX: &str = "lob-";

/// Errors raised while selecting a schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// No schema is defined for the index name.
    #[error("No schema logic defined for index '{0}'")]
    Undefined(String),
}

/// Family of schemas an index name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// `events-index`.
    Events,
    /// `domain-summaries-index`.
    DomainSummaries,
    /// `api-docs-index`.
    ApiDocs,
    /// Any `lob-*` index.
    LineOfBusiness,
}

impl IndexKind {
    /// Resolve an index name to its schema family.
    pub fn resolve(index_name: &str) -> Result<Self, SchemaError> {
        if index_name.starts_with(LOB_INDEX_PREFIX) {
            return Ok(Self::LineOfBusiness);
        }
        match index_name {
            EVENTS_INDEX => Ok(Self::Events),
            DOMAIN_SUMMARIES_INDEX => Ok(Self::DomainSummaries),
            API_DOCS_INDEX => Ok(Self::ApiDocs),
            other => Err(SchemaError::Undefined(other.to_string())),
        }
    }

    /// Build the schema of this family for `index_name`.
    pub fn schema(self, index_name: &str, dimension: usize) -> IndexSchema {
        match self {
            Self::Events => events_schema(index_name, dimension),
            Self::DomainSummaries => {
                chunk_schema(index_name, dimension, "mySummariesSemanticConfig")
            }
            Self::ApiDocs => chunk_schema(index_name, dimension, "myApiDocsSemanticConfig"),
            Self::LineOfBusiness => lob_schema(index_name, dimension),
        }
    }
}

/// Build the index schema for `index_name` with vectors of `dimension` floats.
pub fn build_index_schema(index_name: &str, dimension: usize) -> Result<IndexSchema, SchemaError> {
    let kind = IndexKind::resolve(index_name)?;
    tracing::debug!(index = index_name, ?kind, dimension, "Building index schema");
    Ok(kind.schema(index_name, dimension))
}

const HNSW_ALGORITHM: &str = "myHnsw";
const HNSW_PROFILE: &str = "myHnswProfile";

fn events_schema(index_name: &str, dimension: usize) -> IndexSchema {
    let additional_info = SearchField::complex(
        "additional_info",
        vec![
            SearchField::text("zone_id").filterable(),
            SearchField::timestamp("timestamp"),
            SearchField::text("camera_id").filterable(),
            SearchField::text("building").filterable(),
            SearchField::text("floor").filterable(),
            SearchField::text("location").filterable(),
            SearchField::text("cisco_ai").filterable(),
            SearchField::text_collection("recommended_actions"),
            SearchField::text_collection("urls_for_further_action"),
            SearchField::text_collection("extra_notes"),
        ],
    );

    IndexSchema {
        name: index_name.to_string(),
        fields: vec![
            SearchField::text("id").key().filterable(),
            SearchField::text("event_id").filterable(),
            SearchField::text("event_name"),
            SearchField::text("event_type").filterable(),
            SearchField::text("content"),
            SearchField::vector("embedding", dimension, HNSW_PROFILE),
            additional_info,
        ],
        vector_search: VectorSearch::hnsw(HNSW_ALGORITHM, HNSW_PROFILE),
        semantic: SemanticSearch {
            configurations: vec![SemanticConfiguration::new(
                "myEventsSemanticConfig",
                Some("event_name"),
                &["content"],
                &["event_type", "event_id"],
            )],
        },
        cors_options: CorsOptions::default(),
    }
}

/// Shared layout of the domain-summary and API-doc indexes.
fn chunk_schema(index_name: &str, dimension: usize, semantic_config: &str) -> IndexSchema {
    IndexSchema {
        name: index_name.to_string(),
        fields: vec![
            SearchField::text("id").key().filterable(),
            SearchField::text("title"),
            SearchField::text("content"),
            SearchField::text("platform").filterable(),
            SearchField::text("doc_type").filterable(),
            SearchField::vector("embedding", dimension, HNSW_PROFILE),
        ],
        vector_search: VectorSearch::hnsw(HNSW_ALGORITHM, HNSW_PROFILE),
        semantic: SemanticSearch {
            configurations: vec![SemanticConfiguration::new(
                semantic_config,
                Some("title"),
                &["content"],
                &["platform"],
            )],
        },
        cors_options: CorsOptions::default(),
    }
}

fn lob_schema(index_name: &str, dimension: usize) -> IndexSchema {
    IndexSchema {
        name: index_name.to_string(),
        fields: vec![
            SearchField::text("id").key().filterable(),
            SearchField::text("content"),
            SearchField::vector("embedding", dimension, "lobHnswProfile"),
            SearchField::text("metadata"),
        ],
        vector_search: VectorSearch::hnsw("lobHnsw", "lobHnswProfile"),
        semantic: SemanticSearch {
            configurations: vec![SemanticConfiguration::new(
                &format!("{index_name}-semantic-config"),
                None,
                &["content"],
                &[],
            )],
        },
        cors_options: CorsOptions::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn resolves_named_and_prefixed_indexes() {
        assert_eq!(IndexKind::resolve("events-index"), Ok(IndexKind::Events));
        assert_eq!(
            IndexKind::resolve("domain-summaries-index"),
            Ok(IndexKind::DomainSummaries)
        );
        assert_eq!(IndexKind::resolve("api-docs-index"), Ok(IndexKind::ApiDocs));
        assert_eq!(
            IndexKind::resolve("lob-healthcare"),
            Ok(IndexKind::LineOfBusiness)
        );
        assert_eq!(
            IndexKind::resolve("lob-retail"),
            Ok(IndexKind::LineOfBusiness)
        );
    }

    #[test]
    fn unknown_index_is_a_configuration_error() {
        let error = build_index_schema("events", 1536).unwrap_err();
        assert_eq!(error, SchemaError::Undefined("events".into()));
        assert_eq!(
            error.to_string(),
            "No schema logic defined for index 'events'"
        );
    }

    #[test]
    fn every_schema_has_key_text_and_one_vector_field() {
        for name in [
            "events-index",
            "domain-summaries-index",
            "api-docs-index",
            "lob-finance",
        ] {
            let schema = build_index_schema(name, 1536).expect("schema");
            assert_eq!(schema.name, name);
            assert_eq!(schema.key_field(), Some("id"));
            assert_eq!(schema.vector_field(), Some(("embedding", 1536)));
            assert_eq!(
                schema
                    .fields
                    .iter()
                    .filter(|field| field.dimensions.is_some())
                    .count(),
                1
            );
            assert!(
                schema
                    .field("content")
                    .and_then(|field| field.searchable)
                    .unwrap_or(false)
            );

            let params = &schema.vector_search.algorithms[0].hnsw_parameters;
            assert_eq!(
                (params.m, params.ef_construction, params.ef_search),
                (4, 400, 500)
            );
            assert_eq!(params.metric, "cosine");
            assert_eq!(schema.semantic.configurations.len(), 1);
        }
    }

    #[test]
    fn vector_dimension_follows_argument() {
        let schema = build_index_schema("api-docs-index", 3072).expect("schema");
        assert_eq!(schema.vector_field(), Some(("embedding", 3072)));
    }

    #[test]
    fn events_schema_nests_additional_info() {
        let schema = build_index_schema("events-index", 1536).expect("schema");
        let info = schema.field("additional_info").expect("complex field");
        assert_eq!(info.field_type, FieldType::Complex);

        let names: Vec<&str> = info.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "zone_id",
                "timestamp",
                "camera_id",
                "building",
                "floor",
                "location",
                "cisco_ai",
                "recommended_actions",
                "urls_for_further_action",
                "extra_notes",
            ]
        );
        let timestamp = &info.fields[1];
        assert_eq!(timestamp.field_type, FieldType::DateTimeOffset);
        assert_eq!(timestamp.sortable, Some(true));
        assert_eq!(info.fields[9].field_type, FieldType::StringCollection);
    }

    #[test]
    fn events_schema_serializes_to_rest_shape() {
        let schema = build_index_schema("events-index", 1536).expect("schema");
        let value = serde_json::to_value(&schema).expect("json");

        assert_eq!(
            value["vectorSearch"],
            json!({
                "algorithms": [{
                    "name": "myHnsw",
                    "kind": "hnsw",
                    "hnswParameters": { "m": 4, "efConstruction": 400, "efSearch": 500, "metric": "cosine" }
                }],
                "profiles": [{ "name": "myHnswProfile", "algorithm": "myHnsw" }]
            })
        );
        assert_eq!(
            value["semantic"]["configurations"][0],
            json!({
                "name": "myEventsSemanticConfig",
                "prioritizedFields": {
                    "titleField": { "fieldName": "event_name" },
                    "prioritizedContentFields": [{ "fieldName": "content" }],
                    "prioritizedKeywordsFields": [{ "fieldName": "event_type" }, { "fieldName": "event_id" }]
                }
            })
        );
        assert_eq!(
            value["corsOptions"],
            json!({ "allowedOrigins": ["*"], "maxAgeInSeconds": 60 })
        );

        let embedding = &value["fields"][5];
        assert_eq!(embedding["type"], "Collection(Edm.Single)");
        assert_eq!(embedding["dimensions"], 1536);
        assert_eq!(embedding["vectorSearchProfile"], "myHnswProfile");

        let complex = &value["fields"][6];
        assert_eq!(complex["type"], "Edm.ComplexType");
        assert_eq!(complex.get("searchable"), None);
        assert_eq!(complex["fields"].as_array().map(Vec::len), Some(10));

        assert_eq!(value["fields"][0]["key"], Value::Bool(true));
        assert_eq!(value["fields"][2]["filterable"], Value::Bool(false));
    }

    #[test]
    fn lob_schema_has_untitled_semantic_config() {
        let schema = build_index_schema("lob-healthcare", 1536).expect("schema");
        let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "content", "embedding", "metadata"]);
        assert_eq!(
            schema.field("embedding").and_then(|f| f.vector_search_profile.as_deref()),
            Some("lobHnswProfile")
        );

        let config = &schema.semantic.configurations[0];
        assert_eq!(config.name, "lob-healthcare-semantic-config");
        assert!(config.prioritized_fields.title_field.is_none());
        assert!(config.prioritized_fields.prioritized_keywords_fields.is_empty());

        let value = serde_json::to_value(&schema).expect("json");
        assert_eq!(
            value["semantic"]["configurations"][0]["prioritizedFields"].get("titleField"),
            None
        );
    }

    #[test]
    fn summaries_and_api_docs_differ_only_in_semantic_name() {
        let summaries = build_index_schema("domain-summaries-index", 1536).expect("schema");
        let api_docs = build_index_schema("api-docs-index", 1536).expect("schema");
        assert_eq!(summaries.fields, api_docs.fields);
        assert_eq!(
            summaries.semantic.configurations[0].name,
            "mySummariesSemanticConfig"
        );
        assert_eq!(
            api_docs.semantic.configurations[0].name,
            "myApiDocsSemanticConfig"
        );
    }
}
