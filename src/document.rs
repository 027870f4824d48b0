//! Documents uploaded to the search indexes.
//!
//! Each variant matches the field set of one schema family; serialization produces exactly the
//! JSON object the index expects, with absent optional event details left out entirely.

use serde::Serialize;

/// Chunk of a domain summary or API document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkDocument {
    /// Document key.
    pub id: String,
    /// Chunk text.
    pub content: String,
    /// Platform the source belongs to.
    pub platform: String,
    /// Kind of source document.
    pub doc_type: String,
    /// Embedding of `content`.
    pub embedding: Vec<f32>,
}

/// Structured details attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdditionalInfo {
    /// Zone in which the event was detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    /// Detection time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Camera that produced the detection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_id: Option<String>,
    /// Building name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    /// Floor within the building.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    /// Free-form location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// AI annotation attached by the detector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cisco_ai: Option<String>,
    /// Suggested follow-up actions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommended_actions: Vec<String>,
    /// Links for follow-up actions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls_for_further_action: Vec<String>,
    /// Additional notes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_notes: Vec<String>,
}

/// One detected event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDocument {
    /// Document key, equal to `event_id`.
    pub id: String,
    /// Event identifier.
    pub event_id: String,
    /// Event source name.
    pub event_name: String,
    /// Event classification.
    pub event_type: String,
    /// Plain-text rendering of the event.
    pub content: String,
    /// Structured event details.
    pub additional_info: AdditionalInfo,
    /// Embedding of `content`.
    pub embedding: Vec<f32>,
}

/// One line-of-business record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LobDocument {
    /// Document key.
    pub id: String,
    /// Concatenated string fields of the record.
    pub content: String,
    /// Embedding of `content`.
    pub embedding: Vec<f32>,
    /// Full source record as JSON text.
    pub metadata: String,
}

/// Any document the pipelines upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Document {
    /// Domain summary or API doc chunk.
    Chunk(ChunkDocument),
    /// Event record.
    Event(EventDocument),
    /// Line-of-business record.
    LineOfBusiness(LobDocument),
}

impl Document {
    /// Document key.
    pub fn id(&self) -> &str {
        match self {
            Self::Chunk(doc) => &doc.id,
            Self::Event(doc) => &doc.id,
            Self::LineOfBusiness(doc) => &doc.id,
        }
    }

    /// Embedding vector.
    pub fn embedding(&self) -> &[f32] {
        match self {
            Self::Chunk(doc) => &doc.embedding,
            Self::Event(doc) => &doc.embedding,
            Self::LineOfBusiness(doc) => &doc.embedding,
        }
    }

    /// Mutable access to the embedding, filled in after the document is assembled.
    pub fn embedding_mut(&mut self) -> &mut Vec<f32> {
        match self {
            Self::Chunk(doc) => &mut doc.embedding,
            Self::Event(doc) => &mut doc.embedding,
            Self::LineOfBusiness(doc) => &mut doc.embedding,
        }
    }

    /// Text that was embedded.
    pub fn content(&self) -> &str {
        match self {
            Self::Chunk(doc) => &doc.content,
            Self::Event(doc) => &doc.content,
            Self::LineOfBusiness(doc) => &doc.content,
        }
    }
}

impl From<ChunkDocument> for Document {
    fn from(doc: ChunkDocument) -> Self {
        Self::Chunk(doc)
    }
}

impl From<EventDocument> for Document {
    fn from(doc: EventDocument) -> Self {
        Self::Event(doc)
    }
}

impl From<LobDocument> for Document {
    fn from(doc: LobDocument) -> Self {
        Self::LineOfBusiness(doc)
    }
}

/// Generate a random document key for records without one.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_document_omits_absent_details() {
        let doc = Document::from(EventDocument {
            id: "e1".into(),
            event_id: "e1".into(),
            event_name: "Spaces".into(),
            event_type: "occupancy".into(),
            content: "Detected event: occupancy.".into(),
            additional_info: AdditionalInfo {
                zone_id: Some("z9".into()),
                recommended_actions: vec!["notify".into()],
                ..Default::default()
            },
            embedding: vec![0.5],
        });

        assert_eq!(
            serde_json::to_value(&doc).expect("json"),
            json!({
                "id": "e1",
                "event_id": "e1",
                "event_name": "Spaces",
                "event_type": "occupancy",
                "content": "Detected event: occupancy.",
                "additional_info": { "zone_id": "z9", "recommended_actions": ["notify"] },
                "embedding": [0.5]
            })
        );
    }

    #[test]
    fn untagged_variants_serialize_flat() {
        let doc = Document::from(LobDocument {
            id: "r1".into(),
            content: "text".into(),
            embedding: vec![1.0, 2.0],
            metadata: "{}".into(),
        });
        assert_eq!(doc.id(), "r1");
        assert_eq!(doc.embedding().len(), 2);
        assert_eq!(
            serde_json::to_value(&doc).expect("json"),
            json!({ "id": "r1", "content": "text", "embedding": [1.0, 2.0], "metadata": "{}" })
        );
    }

    #[test]
    fn generated_ids_are_unique_uuids() {
        let first = generate_id();
        let second = generate_id();
        assert_ne!(first, second);
        assert!(uuid::Uuid::parse_str(&first).is_ok());
    }
}
