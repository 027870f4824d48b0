//! Events pipeline.
//!
//! Source: `events/sample_events.json`, an array of event objects. Each event becomes exactly one
//! document whose key is the event id, with a plain-text `content` line built from the event's
//! type, zone, time, camera and location.

use super::{PipelineContext, PipelineError, RunSummary, read_json, truthy_text};
use crate::document::{AdditionalInfo, Document, EventDocument, generate_id};
use crate::indexer::DEFAULT_BATCH_SIZE;
use serde_json::{Map, Value};

/// Location of the events file under the data directory.
pub const SOURCE_FILE: &str = "events/sample_events.json";

const DEFAULT_EVENT_TYPE: &str = "unknown_type";
const DEFAULT_EVENT_NAME: &str = "Spaces";

/// Embed and upload every event into `index_name`.
pub async fn run(ctx: &PipelineContext, index_name: &str) -> Result<RunSummary, PipelineError> {
    tracing::info!(index = index_name, "Processing events");
    let indexer = ctx.open_index(index_name).await?;

    let path = ctx.source_path(SOURCE_FILE);
    let events = match read_json(&path)? {
        Value::Array(events) => events,
        other => vec![other],
    };

    let mut skipped = 0;
    let mut documents = Vec::with_capacity(events.len());
    for event in &events {
        match event.as_object() {
            Some(event) => documents.push(Document::from(event_document(event))),
            None => {
                tracing::warn!(event = %event, "Event is not an object; skipping");
                ctx.skip(&mut skipped);
            }
        }
    }
    tracing::info!(index = index_name, events = documents.len(), "Prepared event documents");

    ctx.embed_and_upload(&indexer, documents, skipped, DEFAULT_BATCH_SIZE)
        .await
}

/// Build the document for one event, with an empty embedding.
pub fn event_document(event: &Map<String, Value>) -> EventDocument {
    let event_type =
        truthy_text(event.get("event_type")).unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());
    let event_name =
        truthy_text(event.get("event")).unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string());
    let event_id = truthy_text(event.get("event_id")).unwrap_or_else(generate_id);

    let raw_info = event
        .get("additional_info")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let additional_info = additional_info(&raw_info);
    let content = event_content(&event_type, &additional_info);

    EventDocument {
        id: event_id.clone(),
        event_id,
        event_name,
        event_type,
        content,
        additional_info,
        embedding: Vec::new(),
    }
}

/// Keep the truthy event details; everything else is omitted.
pub fn additional_info(raw: &Map<String, Value>) -> AdditionalInfo {
    let text = |key: &str| truthy_text(raw.get(key));
    let list = |key: &str| text_list(raw.get(key));

    AdditionalInfo {
        zone_id: text("zone_id"),
        timestamp: text("timestamp"),
        camera_id: text("camera_id"),
        building: text("building"),
        floor: text("floor"),
        location: text("location"),
        cisco_ai: text("cisco_ai"),
        recommended_actions: list("recommended_actions"),
        urls_for_further_action: list("urls_for_further_action"),
        extra_notes: list("extra_notes"),
    }
}

/// Plain-text rendering of an event, e.g.
/// `Detected event: intrusion. in zone: z1. at 2024-01-01T00:00:00Z. Location: HQ / floor 2.`
pub fn event_content(event_type: &str, info: &AdditionalInfo) -> String {
    let mut parts = vec![format!("Detected event: {event_type}")];
    if let Some(zone) = &info.zone_id {
        parts.push(format!("in zone: {zone}"));
    }
    if let Some(timestamp) = &info.timestamp {
        parts.push(format!("at {timestamp}"));
    }
    if let Some(camera) = &info.camera_id {
        parts.push(format!("camera={camera}"));
    }

    let mut location = Vec::new();
    if let Some(building) = &info.building {
        location.push(building.clone());
    }
    if let Some(floor) = &info.floor {
        location.push(format!("floor {floor}"));
    }
    if let Some(place) = &info.location {
        location.push(place.clone());
    }
    if !location.is_empty() {
        parts.push(format!("Location: {}", location.join(" / ")));
    }

    format!("{}.", parts.join(". "))
}

fn text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| truthy_text(Some(item)))
            .collect(),
        other => truthy_text(other).into_iter().collect(),
    }
}
