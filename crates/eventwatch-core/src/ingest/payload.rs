//! Ingestion payload normalization.
//!
//! The extractor may hand over either a JSON string (raw model output) or
//! an already-structured JSON value. Both are normalized here into a single
//! [`EventBody`] before anything reaches the catalog.

use serde::Deserialize;
use serde_json::Value;

use eventwatch_types::error::CatalogError;
use eventwatch_types::event::EventBody;

/// An extracted event as handed over by the extractor or an API caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IngestPayload {
    /// Serialized JSON text, possibly wrapped in a Markdown code fence.
    Raw(String),
    /// Already-parsed JSON.
    Structured(Value),
}

impl From<String> for IngestPayload {
    fn from(text: String) -> Self {
        IngestPayload::Raw(text)
    }
}

impl From<Value> for IngestPayload {
    fn from(value: Value) -> Self {
        IngestPayload::Structured(value)
    }
}

/// Normalize a payload into an event body.
///
/// Fails with [`CatalogError::Validation`] when a string does not parse as
/// JSON, the JSON is not an object, or `summary` is missing, empty or not a
/// string. Every other attribute is kept as-is whatever its shape. An `id`
/// key is discarded: ids are only ever assigned by the record store.
pub fn parse_payload(payload: IngestPayload) -> Result<EventBody, CatalogError> {
    let value = match payload {
        IngestPayload::Raw(text) => serde_json::from_str::<Value>(strip_code_fence(&text))
            .map_err(|e| CatalogError::validation(format!("invalid JSON string: {e}")))?,
        IngestPayload::Structured(value) => value,
    };

    let Value::Object(mut map) = value else {
        return Err(CatalogError::validation("event payload must be a JSON object"));
    };

    map.remove("id");

    let summary = match map.remove("summary") {
        Some(Value::String(summary)) if !summary.trim().is_empty() => summary,
        Some(Value::String(_)) | Some(Value::Null) | None => {
            return Err(CatalogError::validation("event must include a summary field"));
        }
        Some(_) => return Err(CatalogError::validation("summary must be a string")),
    };

    Ok(EventBody {
        summary,
        attributes: map,
    })
}

/// Strip a surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
