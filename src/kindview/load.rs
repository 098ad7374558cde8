//! # Record Loader
//!
//! Turns the raw property tuples a store hands back into a normalized [`Record`].
//!
//! Raw values arrive in the store's JSON wire encoding (a Datastore `Value`
//! object such as `{"integerValue": "120"}`), so their dynamic type is read from
//! whichever `*Value` field is present. Plain JSON scalars and arrays are
//! accepted as shorthand, which keeps fixtures readable.
//!
//! Loading is all-or-nothing: a single unclassifiable property fails the whole
//! record, and no partially loaded record is ever handed back.

use crate::error::{BrowseError, Result};
use crate::model::{GeoPoint, KeyRef, Property, Record, Value, KEY_PROPERTY};
use crate::store::wire;
use base64::Engine;
use chrono::DateTime;
use serde_json::{Map, Value as Json};

/// Maximum nesting of sub-records and lists below a top-level property.
pub const MAX_NESTING_DEPTH: usize = 32;

/// One `(name, rawValue, indexed)` tuple as delivered by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProperty {
    pub name: String,
    pub value: Json,
    pub indexed: bool,
}

impl RawProperty {
    pub fn new(name: impl Into<String>, value: Json, indexed: bool) -> Self {
        Self {
            name: name.into(),
            value,
            indexed,
        }
    }
}

/// A store row: its identity plus the property tuple stream.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntity {
    pub key: KeyRef,
    pub properties: Vec<RawProperty>,
}

impl RawEntity {
    pub fn new(key: KeyRef, properties: Vec<RawProperty>) -> Self {
        Self { key, properties }
    }

    pub fn property(&self, name: &str) -> Option<&RawProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Normalizes one raw row into a fresh record carrying the synthetic `key`.
pub fn normalize(raw: &[RawProperty], key: &KeyRef) -> Result<Record> {
    let mut record = Record::new();
    load_into(&mut record, raw, key)?;
    Ok(record)
}

/// Loads a raw row into a reused accumulator.
///
/// The accumulator is cleared before anything else happens, so it never mixes
/// with a previous row, and stays empty when loading fails.
pub fn load_into(target: &mut Record, raw: &[RawProperty], key: &KeyRef) -> Result<()> {
    target.clear();

    let mut record = Record::new();
    for property in raw {
        let value = classify(&property.name, &property.value, 0)?;
        record.insert(Property::new(&property.name, value, property.indexed));
    }
    // The store's identity wins over any raw property that happens to be named "key".
    record.insert(Property::new(
        KEY_PROPERTY,
        Value::KeyRef(key.clone()),
        true,
    ));

    tracing::trace!(key = %key, properties = record.len(), "normalized record");
    *target = record;
    Ok(())
}

/// Normalizes a whole store batch, failing on the first bad row.
pub fn normalize_entities(entities: &[RawEntity]) -> Result<Vec<Record>> {
    entities
        .iter()
        .map(|entity| normalize(&entity.properties, &entity.key))
        .collect()
}

fn classify(path: &str, raw: &Json, depth: usize) -> Result<Value> {
    match raw {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => Ok(match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => Value::Float64(n.as_f64().unwrap_or(f64::NAN)),
        }),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Array(items) => classify_list(path, items, depth),
        Json::Object(fields) => classify_wire(path, fields, depth),
    }
}

fn classify_wire(path: &str, fields: &Map<String, Json>, depth: usize) -> Result<Value> {
    let Some((field, payload)) = fields.iter().find(|(k, _)| k.ends_with("Value")) else {
        let observed = fields
            .keys()
            .find(|k| !wire::is_value_annotation(k))
            .map(String::as_str)
            .unwrap_or("object");
        return Err(BrowseError::unsupported(path, observed));
    };

    match field.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => payload
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| BrowseError::malformed(path, "booleanValue is not a boolean")),
        "integerValue" => parse_integer(payload)
            .map(Value::Int64)
            .ok_or_else(|| BrowseError::malformed(path, format!("bad integerValue {payload}"))),
        "doubleValue" => parse_double(payload)
            .map(Value::Float64)
            .ok_or_else(|| BrowseError::malformed(path, format!("bad doubleValue {payload}"))),
        "stringValue" => payload
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| BrowseError::malformed(path, "stringValue is not a string")),
        "blobValue" => {
            let encoded = payload
                .as_str()
                .ok_or_else(|| BrowseError::malformed(path, "blobValue is not a string"))?;
            base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map(Value::Bytes)
                .map_err(|e| BrowseError::malformed(path, format!("blobValue: {e}")))
        }
        "timestampValue" => {
            let text = payload
                .as_str()
                .ok_or_else(|| BrowseError::malformed(path, "timestampValue is not a string"))?;
            DateTime::parse_from_rfc3339(text)
                .map(Value::Timestamp)
                .map_err(|e| BrowseError::malformed(path, format!("timestampValue: {e}")))
        }
        "geoPointValue" => {
            let coordinate = |name: &str| payload.get(name).and_then(Json::as_f64);
            match (coordinate("latitude"), coordinate("longitude")) {
                (Some(latitude), Some(longitude)) => {
                    Ok(Value::GeoPoint(GeoPoint::new(latitude, longitude)))
                }
                _ => Err(BrowseError::malformed(
                    path,
                    "geoPointValue needs numeric latitude/longitude",
                )),
            }
        }
        "keyValue" => wire::key_from_json(payload)
            .map(Value::KeyRef)
            .map_err(|reason| BrowseError::malformed(path, reason)),
        "entityValue" => classify_entity(path, payload, depth),
        "arrayValue" => {
            let values = match payload.get("values") {
                None | Some(Json::Null) => &[][..],
                Some(Json::Array(values)) => values.as_slice(),
                Some(_) => {
                    return Err(BrowseError::malformed(path, "arrayValue.values is not a list"))
                }
            };
            classify_list(path, values, depth)
        }
        other => Err(BrowseError::unsupported(path, other)),
    }
}

fn classify_entity(path: &str, payload: &Json, depth: usize) -> Result<Value> {
    let depth = descend(path, depth)?;
    let properties = match payload.get("properties") {
        None | Some(Json::Null) => None,
        Some(Json::Object(properties)) => Some(properties),
        Some(_) => {
            return Err(BrowseError::malformed(
                path,
                "entityValue.properties is not an object",
            ))
        }
    };

    let mut record = Record::new();
    for (name, raw) in properties.into_iter().flatten() {
        let nested_path = format!("{path}.{name}");
        let value = classify(&nested_path, raw, depth)?;
        record.insert(Property::new(name, value, wire::is_indexed(raw)));
    }
    Ok(Value::Record(record))
}

fn classify_list(path: &str, items: &[Json], depth: usize) -> Result<Value> {
    let depth = descend(path, depth)?;
    items
        .iter()
        .map(|item| classify(path, item, depth))
        .collect::<Result<Vec<_>>>()
        .map(Value::List)
}

fn descend(path: &str, depth: usize) -> Result<usize> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(BrowseError::RecursionLimitExceeded {
            property: path.to_string(),
            limit: MAX_NESTING_DEPTH,
        });
    }
    Ok(depth + 1)
}

fn parse_integer(payload: &Json) -> Option<i64> {
    match payload {
        Json::String(s) => s.trim().parse().ok(),
        Json::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn parse_double(payload: &Json) -> Option<f64> {
    match payload {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            other => other.parse().ok(),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(name: &str, value: Json) -> RawProperty {
        RawProperty::new(name, value, true)
    }

    fn load_one(value: Json) -> Result<Value> {
        let record = normalize(&[raw("p", value)], &KeyRef::new("T/1"))?;
        Ok(record.value("p").cloned().unwrap())
    }

    #[test]
    fn normalizes_plain_tuples_and_injects_key() {
        let record = normalize(
            &[
                RawProperty::new("name", json!("Apple"), true),
                RawProperty::new("weight", json!({"integerValue": "120"}), false),
            ],
            &KeyRef::new("Fruit/1"),
        )
        .unwrap();

        assert_eq!(record.value("name"), Some(&Value::String("Apple".into())));
        assert_eq!(record.value("weight"), Some(&Value::Int64(120)));
        assert!(!record.get("weight").unwrap().indexed);
        assert_eq!(
            record.value(KEY_PROPERTY),
            Some(&Value::KeyRef(KeyRef::new("Fruit/1")))
        );
        assert_eq!(record.get(KEY_PROPERTY).unwrap().type_tag, "key");
    }

    #[test]
    fn synthetic_key_overrides_raw_key_property() {
        let record = normalize(&[raw("key", json!("spoofed"))], &KeyRef::new("Fruit/9")).unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.key().map(KeyRef::as_str), Some("Fruit/9"));
    }

    #[test]
    fn classifies_every_wire_variant() {
        assert_eq!(load_one(json!({"nullValue": null})).unwrap(), Value::Null);
        assert_eq!(
            load_one(json!({"booleanValue": true})).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            load_one(json!({"integerValue": "-7"})).unwrap(),
            Value::Int64(-7)
        );
        assert_eq!(
            load_one(json!({"doubleValue": 2.5})).unwrap(),
            Value::Float64(2.5)
        );
        assert!(matches!(
            load_one(json!({"doubleValue": "NaN"})).unwrap(),
            Value::Float64(f) if f.is_nan()
        ));
        assert_eq!(
            load_one(json!({"stringValue": ""})).unwrap(),
            Value::String(String::new())
        );
        assert_eq!(
            load_one(json!({"blobValue": "aGk="})).unwrap(),
            Value::Bytes(b"hi".to_vec())
        );
        assert!(matches!(
            load_one(json!({"timestampValue": "2024-03-01T10:00:00+02:00"})).unwrap(),
            Value::Timestamp(_)
        ));
        assert_eq!(
            load_one(json!({"geoPointValue": {"latitude": 1.5, "longitude": -2.0}})).unwrap(),
            Value::GeoPoint(GeoPoint::new(1.5, -2.0))
        );
        assert_eq!(
            load_one(json!({"keyValue": {"path": [{"kind": "Fruit", "id": "4"}]}})).unwrap(),
            Value::KeyRef(KeyRef::new("Fruit/4"))
        );
        assert_eq!(
            load_one(json!({"arrayValue": {"values": [{"integerValue": "1"}, "a"]}})).unwrap(),
            Value::List(vec![Value::Int64(1), Value::String("a".into())])
        );
        assert_eq!(
            load_one(json!({"arrayValue": {}})).unwrap(),
            Value::List(vec![])
        );
    }

    #[test]
    fn plain_numbers_split_into_int_and_float() {
        assert_eq!(load_one(json!(3)).unwrap(), Value::Int64(3));
        assert_eq!(load_one(json!(3.25)).unwrap(), Value::Float64(3.25));
    }

    #[test]
    fn nested_entity_becomes_record_in_store_order() {
        let value = load_one(json!({
            "entityValue": {
                "properties": {
                    "zip": {"stringValue": "12180", "excludeFromIndexes": true},
                    "city": {"stringValue": "Troy"}
                }
            }
        }))
        .unwrap();

        let Value::Record(record) = value else {
            panic!("expected a nested record");
        };
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["zip", "city"]);
        assert!(!record.get("zip").unwrap().indexed);
        assert!(record.get("city").unwrap().indexed);
        // Only top-level records carry the synthetic key.
        assert!(!record.contains(KEY_PROPERTY));
    }

    #[test]
    fn unknown_wire_type_is_rejected() {
        let err = load_one(json!({"vectorValue": [1, 2]})).unwrap_err();
        assert!(matches!(
            err,
            BrowseError::UnsupportedType { ref property, ref observed }
                if property == "p" && observed == "vectorValue"
        ));
    }

    #[test]
    fn untyped_object_is_rejected() {
        let err = load_one(json!({"meaning": 15, "lat": 1})).unwrap_err();
        assert!(matches!(
            err,
            BrowseError::UnsupportedType { ref observed, .. } if observed == "lat"
        ));
    }

    #[test]
    fn nested_failure_reports_dotted_path() {
        let err = load_one(json!({
            "entityValue": {"properties": {"inner": {"mysteryValue": 1}}}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            BrowseError::UnsupportedType { ref property, .. } if property == "p.inner"
        ));
    }

    #[test]
    fn malformed_payloads_fail() {
        assert!(matches!(
            load_one(json!({"integerValue": "twelve"})),
            Err(BrowseError::MalformedValue { .. })
        ));
        assert!(matches!(
            load_one(json!({"blobValue": "!!!"})),
            Err(BrowseError::MalformedValue { .. })
        ));
        assert!(matches!(
            load_one(json!({"timestampValue": "yesterday"})),
            Err(BrowseError::MalformedValue { .. })
        ));
        for geo in [
            json!({"geoPointValue": "nowhere"}),
            json!({"geoPointValue": {}}),
            json!({"geoPointValue": {"latitude": 1.5}}),
            json!({"geoPointValue": {"latitude": "north", "longitude": 2.0}}),
        ] {
            assert!(
                matches!(load_one(geo.clone()), Err(BrowseError::MalformedValue { .. })),
                "{geo}"
            );
        }
    }

    fn nested(levels: usize) -> Json {
        let mut value = json!({"stringValue": "leaf"});
        for _ in 0..levels {
            value = json!({"entityValue": {"properties": {"child": value}}});
        }
        value
    }

    #[test]
    fn nesting_at_limit_is_accepted() {
        assert!(load_one(nested(MAX_NESTING_DEPTH)).is_ok());
    }

    #[test]
    fn nesting_past_limit_fails() {
        let err = load_one(nested(MAX_NESTING_DEPTH + 1)).unwrap_err();
        assert!(matches!(
            err,
            BrowseError::RecursionLimitExceeded { limit, .. } if limit == MAX_NESTING_DEPTH
        ));
    }

    #[test]
    fn failure_is_all_or_nothing() {
        let mut target = Record::new();
        load_into(
            &mut target,
            &[raw("a", json!(1))],
            &KeyRef::new("T/1"),
        )
        .unwrap();
        assert_eq!(target.len(), 2);

        let err = load_into(
            &mut target,
            &[raw("b", json!(2)), raw("c", json!({"oddValue": 1}))],
            &KeyRef::new("T/2"),
        );
        assert!(err.is_err());
        assert!(target.is_empty());
    }

    #[test]
    fn reused_accumulator_does_not_merge() {
        let mut target = Record::new();
        load_into(
            &mut target,
            &[raw("a", json!(1)), raw("b", json!(2))],
            &KeyRef::new("T/1"),
        )
        .unwrap();
        load_into(&mut target, &[raw("c", json!(3))], &KeyRef::new("T/2")).unwrap();

        assert_eq!(target.names().collect::<Vec<_>>(), vec!["c", "key"]);
        assert_eq!(target.key().map(KeyRef::as_str), Some("T/2"));
    }

    #[test]
    fn batch_normalization_stops_at_first_bad_row() {
        let entities = vec![
            RawEntity::new(KeyRef::new("T/1"), vec![raw("a", json!(1))]),
            RawEntity::new(KeyRef::new("T/2"), vec![raw("a", json!({"oddValue": 1}))]),
        ];
        assert!(normalize_entities(&entities).is_err());
        assert_eq!(normalize_entities(&entities[..1]).unwrap().len(), 1);
    }
}
