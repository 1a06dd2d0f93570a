//! Firestore-backed data for the music timeline.
//!
//! Decodes `albums`/`comments` exports into `timeline-core` records, defines the
//! [`DocumentStore`] seam the pages talk to, and implements the album/comment
//! operations (ownership checks, one review per user, cascading delete) on top of it.

mod memory;
mod service;
mod store;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use timeline_core::{Album, Comment, TimelineError};

pub use memory::MemoryDatabase;
pub use service::{AlbumService, ServiceError};
pub use store::{follow_albums, DocumentStore, SnapshotStream, StoreError};

pub const ALBUMS_COLLECTION: &str = "albums";
pub const COMMENTS_COLLECTION: &str = "comments";

/// Decode albums from a JSON export string.
pub fn albums_from_str(json: &str) -> Result<Vec<Album>, TimelineError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| TimelineError::Parse(err.to_string()))?;
    albums_from_value(&value)
}

/// Decode albums from either a plain array of documents or a REST `documents` listing.
pub fn albums_from_value(value: &Value) -> Result<Vec<Album>, TimelineError> {
    decode_collection(value, ALBUMS_COLLECTION)
}

pub fn comments_from_str(json: &str) -> Result<Vec<Comment>, TimelineError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| TimelineError::Parse(err.to_string()))?;
    comments_from_value(&value)
}

pub fn comments_from_value(value: &Value) -> Result<Vec<Comment>, TimelineError> {
    decode_collection(value, COMMENTS_COLLECTION)
}

fn decode_collection<T: DeserializeOwned>(
    value: &Value,
    collection: &str,
) -> Result<Vec<T>, TimelineError> {
    let documents = collection_documents(value, collection)?;

    documents
        .iter()
        .enumerate()
        .map(|(index, document)| {
            let plain = plain_document(document).ok_or_else(|| {
                TimelineError::Parse(format!("{collection}[{index}] is not an object"))
            })?;
            serde_json::from_value(Value::Object(plain))
                .map_err(|err| TimelineError::Parse(format!("{collection}[{index}]: {err}")))
        })
        .collect()
}

/// Finds the document list: a bare array, `{"documents": [...]}` or `{"<collection>": [...]}`.
fn collection_documents<'a>(
    value: &'a Value,
    collection: &str,
) -> Result<&'a [Value], TimelineError> {
    if let Some(array) = value.as_array() {
        return Ok(array);
    }

    let object = value.as_object().ok_or(TimelineError::MissingData)?;
    if let Some(array) = object.get("documents").and_then(Value::as_array) {
        return Ok(array);
    }
    if let Some(array) = object.get(collection).and_then(Value::as_array) {
        return Ok(array);
    }
    // An empty REST listing has no "documents" key at all.
    if object.is_empty() {
        return Ok(&[]);
    }
    Err(TimelineError::MissingData)
}

/// Turns one exported document into the plain field map the core types expect.
fn plain_document(document: &Value) -> Option<Map<String, Value>> {
    let object = document.as_object()?;

    let mut plain = match object.get("fields").and_then(Value::as_object) {
        Some(fields) => fields
            .iter()
            .map(|(key, typed)| (key.clone(), untype_value(typed)))
            .collect::<Map<_, _>>(),
        None => object.clone(),
    };

    if !plain.contains_key("id") {
        if let Some(id) = object
            .get("name")
            .and_then(Value::as_str)
            .and_then(|name| name.rsplit('/').next())
        {
            plain.insert("id".to_string(), Value::String(id.to_string()));
        }
    }

    for field in ["createdAt", "updatedAt"] {
        if let Some(timestamp) = plain.get_mut(field) {
            normalise_timestamp(timestamp);
        }
    }

    Some(plain)
}

/// Converts a REST typed value (`{"stringValue": "..."}` and friends) to plain JSON.
fn untype_value(typed: &Value) -> Value {
    let Some((kind, inner)) = typed.as_object().and_then(|obj| obj.iter().next()) else {
        return typed.clone();
    };

    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "doubleValue" | "booleanValue" => inner.clone(),
        "nullValue" => Value::Null,
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(key, value)| (key.clone(), untype_value(value)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(untype_value).collect())
                .unwrap_or_default(),
        ),
        _ => typed.clone(),
    }
}

/// Accepts RFC 3339 strings, `{seconds, nanoseconds}` objects (also with leading
/// underscores) and epoch milliseconds. Anything unreadable becomes null, the same
/// as a timestamp the server has not filled in yet.
fn normalise_timestamp(value: &mut Value) {
    let parsed = match &*value {
        Value::Null => return,
        Value::String(text) => parse_datetime(text),
        Value::Number(number) => number
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        Value::Object(object) => {
            let seconds = object
                .get("seconds")
                .or_else(|| object.get("_seconds"))
                .and_then(Value::as_i64);
            let nanos = object
                .get("nanoseconds")
                .or_else(|| object.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            seconds.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, nanos as u32))
        }
        _ => None,
    };

    *value = parsed.map_or(Value::Null, |dt| Value::String(dt.to_rfc3339()));
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn untypes_nested_rest_values() {
        let typed = json!({
            "mapValue": { "fields": {
                "month": { "integerValue": "3" },
                "year": { "integerValue": "2020" }
            }}
        });
        assert_eq!(untype_value(&typed), json!({ "month": 3, "year": 2020 }));
        assert_eq!(untype_value(&json!({ "nullValue": null })), Value::Null);
    }

    #[test]
    fn timestamps_accept_several_shapes() {
        let mut seconds = json!({ "seconds": 1_700_000_000, "nanoseconds": 0 });
        normalise_timestamp(&mut seconds);
        assert_eq!(seconds, json!("2023-11-14T22:13:20+00:00"));

        let mut millis = json!(1_700_000_000_000_i64);
        normalise_timestamp(&mut millis);
        assert_eq!(millis, json!("2023-11-14T22:13:20+00:00"));

        let mut garbage = json!("yesterday");
        normalise_timestamp(&mut garbage);
        assert_eq!(garbage, Value::Null);
    }

    #[test]
    fn rejects_non_collection_payloads() {
        assert!(matches!(
            albums_from_value(&json!("albums")),
            Err(TimelineError::MissingData)
        ));
        assert!(matches!(
            albums_from_value(&json!({ "other": [] })),
            Err(TimelineError::MissingData)
        ));
        assert!(albums_from_value(&json!({})).unwrap().is_empty());
    }
}
