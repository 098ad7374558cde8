//! Datastore JSON wire helpers shared by the store adapters and the loader.
//!
//! Entities travel as `{"key": {...}, "properties": {name: Value}}`, where each
//! `Value` is an object with exactly one `*Value` field plus optional
//! annotations (`excludeFromIndexes`, `meaning`).

use crate::error::{BrowseError, Result};
use crate::load::{RawEntity, RawProperty};
use crate::model::KeyRef;
use serde_json::Value as Json;
use std::cmp::Ordering;

/// Fields that may sit next to the `*Value` field without carrying data.
pub fn is_value_annotation(field: &str) -> bool {
    matches!(field, "excludeFromIndexes" | "meaning")
}

/// A wire value is indexed unless it says `excludeFromIndexes: true`.
pub fn is_indexed(raw: &Json) -> bool {
    !raw.get("excludeFromIndexes")
        .and_then(Json::as_bool)
        .unwrap_or(false)
}

/// Builds the canonical key string (`Kind/id[/Kind/name...]`) from a wire key.
pub fn key_from_json(key: &Json) -> std::result::Result<KeyRef, String> {
    let path = key
        .get("path")
        .and_then(Json::as_array)
        .ok_or_else(|| "key has no path".to_string())?;
    if path.is_empty() {
        return Err("key path is empty".to_string());
    }

    let mut parts = Vec::with_capacity(path.len() * 2);
    for element in path {
        let kind = element
            .get("kind")
            .and_then(Json::as_str)
            .ok_or_else(|| "key path element has no kind".to_string())?;
        parts.push(kind.to_string());

        let id = match (element.get("id"), element.get("name")) {
            (Some(Json::String(id)), _) => Some(id.clone()),
            (Some(Json::Number(id)), _) => Some(id.to_string()),
            (_, Some(Json::String(name))) => Some(name.clone()),
            _ => None,
        };
        // Incomplete keys keep only the kind of their last element.
        if let Some(id) = id {
            parts.push(id);
        }
    }
    Ok(KeyRef::new(parts.join("/")))
}

/// Kind of the last key path element.
pub fn kind_from_json(key: &Json) -> Option<&str> {
    key.get("path")?
        .as_array()?
        .last()?
        .get("kind")?
        .as_str()
}

/// Splits a wire entity into its key and raw property tuples.
pub fn entity_from_json(entity: &Json) -> Result<RawEntity> {
    let key_json = entity
        .get("key")
        .ok_or_else(|| BrowseError::store("entity without key"))?;
    let key = key_from_json(key_json).map_err(BrowseError::store)?;

    let properties = match entity.get("properties") {
        None | Some(Json::Null) => Vec::new(),
        Some(Json::Object(properties)) => properties
            .iter()
            .map(|(name, value)| RawProperty::new(name, value.clone(), is_indexed(value)))
            .collect(),
        Some(_) => {
            return Err(BrowseError::store(format!(
                "entity {key} has malformed properties"
            )))
        }
    };
    Ok(RawEntity::new(key, properties))
}

/// Datastore's cross-type ordering rank for a wire value.
fn type_rank(raw: &Json) -> u8 {
    match raw {
        Json::Null => 0,
        Json::Number(_) => 1,
        Json::Bool(_) => 3,
        Json::String(_) => 4,
        Json::Array(_) => 8,
        Json::Object(fields) => {
            match fields
                .keys()
                .find(|k| k.ends_with("Value"))
                .map(String::as_str)
            {
                Some("nullValue") => 0,
                Some("integerValue" | "doubleValue") => 1,
                Some("timestampValue") => 2,
                Some("booleanValue") => 3,
                Some("stringValue" | "blobValue") => 4,
                Some("keyValue") => 5,
                Some("geoPointValue") => 6,
                Some("arrayValue") => 8,
                _ => 9,
            }
        }
    }
}

fn as_number(raw: &Json) -> Option<f64> {
    let payload = match raw {
        Json::Object(fields) => fields.get("integerValue").or_else(|| fields.get("doubleValue"))?,
        other => other,
    };
    match payload {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_text(raw: &Json) -> Option<String> {
    match raw {
        Json::String(s) => Some(s.clone()),
        Json::Bool(b) => Some(b.to_string()),
        Json::Object(fields) => {
            let (field, payload) = fields.iter().find(|(k, _)| k.ends_with("Value"))?;
            match field.as_str() {
                "keyValue" => key_from_json(payload).ok().map(|k| k.as_str().to_string()),
                // RFC3339 in UTC sorts lexically; offsets are rare in exports.
                _ => payload
                    .as_str()
                    .map(str::to_string)
                    .or_else(|| Some(payload.to_string())),
            }
        }
        other => Some(other.to_string()),
    }
}

/// Orders two wire values the way the store orders a sorted query.
pub fn compare_values(a: &Json, b: &Json) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    if rank_a == 1 {
        let (x, y) = (as_number(a).unwrap_or(f64::NAN), as_number(b).unwrap_or(f64::NAN));
        return x.total_cmp(&y);
    }
    as_text(a).cmp(&as_text(b))
}
