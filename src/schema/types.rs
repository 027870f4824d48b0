//! Index definition types serialized in the Azure AI Search REST format.

use serde::Serialize;

/// Data type of a search field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldType {
    /// Plain text.
    #[serde(rename = "Edm.String")]
    String,
    /// Timestamp with offset.
    #[serde(rename = "Edm.DateTimeOffset")]
    DateTimeOffset,
    /// List of strings.
    #[serde(rename = "Collection(Edm.String)")]
    StringCollection,
    /// Vector of single-precision floats.
    #[serde(rename = "Collection(Edm.Single)")]
    SingleCollection,
    /// Nested object with its own sub-fields.
    #[serde(rename = "Edm.ComplexType")]
    Complex,
}

/// One field of an index definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchField {
    /// Field name as stored in documents.
    pub name: String,
    /// Data type of the field.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field is the document key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<bool>,
    /// Whether the field takes part in full-text (or vector) search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searchable: Option<bool>,
    /// Whether the field can be used in `$filter`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filterable: Option<bool>,
    /// Whether the field can be used in `$orderby`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sortable: Option<bool>,
    /// Whether the field can be used for facets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facetable: Option<bool>,
    /// Vector length for vector fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    /// Vector search profile applied to vector fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_search_profile: Option<String>,
    /// Sub-fields of a complex field.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SearchField>,
}

impl SearchField {
    fn with_flags(name: &str, field_type: FieldType, searchable: bool) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            key: Some(false),
            searchable: Some(searchable),
            filterable: Some(false),
            sortable: Some(false),
            facetable: Some(false),
            dimensions: None,
            vector_search_profile: None,
            fields: Vec::new(),
        }
    }

    /// Searchable string field; everything else off.
    pub fn text(name: &str) -> Self {
        Self::with_flags(name, FieldType::String, true)
    }

    /// Searchable list of strings.
    pub fn text_collection(name: &str) -> Self {
        Self::with_flags(name, FieldType::StringCollection, true)
    }

    /// Filterable, sortable timestamp.
    pub fn timestamp(name: &str) -> Self {
        Self::with_flags(name, FieldType::DateTimeOffset, false)
            .filterable()
            .sortable()
    }

    /// Vector field bound to a search profile.
    pub fn vector(name: &str, dimensions: usize, profile: &str) -> Self {
        Self {
            dimensions: Some(dimensions),
            vector_search_profile: Some(profile.to_string()),
            ..Self::with_flags(name, FieldType::SingleCollection, true)
        }
    }

    /// Complex field grouping `fields`.
    pub fn complex(name: &str, fields: Vec<SearchField>) -> Self {
        Self {
            name: name.to_string(),
            field_type: FieldType::Complex,
            key: None,
            searchable: None,
            filterable: None,
            sortable: None,
            facetable: None,
            dimensions: None,
            vector_search_profile: None,
            fields,
        }
    }

    /// Mark the field as the document key.
    pub fn key(mut self) -> Self {
        self.key = Some(true);
        self
    }

    /// Allow filtering on the field.
    pub fn filterable(mut self) -> Self {
        self.filterable = Some(true);
        self
    }

    /// Allow sorting on the field.
    pub fn sortable(mut self) -> Self {
        self.sortable = Some(true);
        self
    }
}

/// HNSW graph parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HnswParameters {
    /// Bi-directional links per node.
    pub m: u32,
    /// Candidate list size during graph construction.
    pub ef_construction: u32,
    /// Candidate list size during search.
    pub ef_search: u32,
    /// Distance metric.
    pub metric: String,
}

impl Default for HnswParameters {
    fn default() -> Self {
        Self {
            m: 4,
            ef_construction: 400,
            ef_search: 500,
            metric: "cosine".into(),
        }
    }
}

/// Named vector search algorithm configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorAlgorithm {
    /// Configuration name referenced by profiles.
    pub name: String,
    /// Algorithm kind (`hnsw`).
    pub kind: String,
    /// Graph parameters.
    pub hnsw_parameters: HnswParameters,
}

/// Named vector search profile pointing at an algorithm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorProfile {
    /// Profile name referenced by vector fields.
    pub name: String,
    /// Algorithm configuration name.
    pub algorithm: String,
}

/// Vector search section of an index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorSearch {
    /// Available algorithms.
    pub algorithms: Vec<VectorAlgorithm>,
    /// Available profiles.
    pub profiles: Vec<VectorProfile>,
}

impl VectorSearch {
    /// One HNSW algorithm and one profile referencing it.
    pub fn hnsw(algorithm: &str, profile: &str) -> Self {
        Self {
            algorithms: vec![VectorAlgorithm {
                name: algorithm.to_string(),
                kind: "hnsw".into(),
                hnsw_parameters: HnswParameters::default(),
            }],
            profiles: vec![VectorProfile {
                name: profile.to_string(),
                algorithm: algorithm.to_string(),
            }],
        }
    }
}

/// Reference to a field from a semantic configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticField {
    /// Referenced field name.
    pub field_name: String,
}

impl From<&str> for SemanticField {
    fn from(field_name: &str) -> Self {
        Self {
            field_name: field_name.to_string(),
        }
    }
}

/// Fields used by semantic ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizedFields {
    /// Title field, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_field: Option<SemanticField>,
    /// Content fields in priority order.
    pub prioritized_content_fields: Vec<SemanticField>,
    /// Keyword fields in priority order.
    pub prioritized_keywords_fields: Vec<SemanticField>,
}

/// Named semantic configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticConfiguration {
    /// Configuration name.
    pub name: String,
    /// Fields used for ranking.
    pub prioritized_fields: PrioritizedFields,
}

impl SemanticConfiguration {
    /// Build a configuration from plain field names.
    pub fn new(name: &str, title: Option<&str>, content: &[&str], keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            prioritized_fields: PrioritizedFields {
                title_field: title.map(SemanticField::from),
                prioritized_content_fields: content.iter().copied().map(Into::into).collect(),
                prioritized_keywords_fields: keywords.iter().copied().map(Into::into).collect(),
            },
        }
    }
}

/// Semantic search section of an index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticSearch {
    /// Available configurations.
    pub configurations: Vec<SemanticConfiguration>,
}

/// CORS settings of an index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsOptions {
    /// Origins allowed to query the index from a browser.
    pub allowed_origins: Vec<String>,
    /// Preflight cache duration.
    pub max_age_in_seconds: u32,
}

impl Default for CorsOptions {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".into()],
            max_age_in_seconds: 60,
        }
    }
}

/// Complete index definition submitted on creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSchema {
    /// Index name.
    pub name: String,
    /// Top-level fields.
    pub fields: Vec<SearchField>,
    /// Vector search configuration.
    pub vector_search: VectorSearch,
    /// Semantic ranking configuration.
    pub semantic: SemanticSearch,
    /// Browser access settings.
    pub cors_options: CorsOptions,
}

impl IndexSchema {
    /// Name of the key field.
    pub fn key_field(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.key == Some(true))
            .map(|field| field.name.as_str())
    }

    /// The vector field and its dimension.
    pub fn vector_field(&self) -> Option<(&str, usize)> {
        self.fields.iter().find_map(|field| {
            field
                .dimensions
                .map(|dimensions| (field.name.as_str(), dimensions))
        })
    }

    /// Look up a top-level field by name.
    pub fn field(&self, name: &str) -> Option<&SearchField> {
        self.fields.iter().find(|field| field.name == name)
    }
}
