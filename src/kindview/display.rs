//! # Display Stringifier
//!
//! Pure, total rendering of normalized values to the strings shown in table
//! cells. Every [`Value`] variant has exactly one canonical form:
//!
//! | Variant     | Rendering                                         |
//! |-------------|---------------------------------------------------|
//! | `Null`      | `NULL`                                            |
//! | `Bool`      | `true` / `false`                                  |
//! | `Int64`     | decimal                                           |
//! | `Float64`   | shortest round-trip decimal, exponent when huge/tiny |
//! | `String`    | as-is, `""` when empty                            |
//! | `Bytes`     | standard base64                                   |
//! | `Timestamp` | RFC3339                                           |
//! | `GeoPoint`  | `Lat: 1.000000, Lng: 2.000000`                    |
//! | `KeyRef`    | canonical key string                              |
//! | `Record`    | `{name:value, other:value, }`                     |
//! | `List`      | `[a, b, c]`                                       |
//!
//! A property that is absent from a record renders as `-`, which is distinct
//! from a present property holding `NULL`.

use crate::model::{Header, Record, Value};
use base64::Engine;
use chrono::SecondsFormat;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

pub const NULL_MARKER: &str = "NULL";
pub const ABSENT_MARKER: &str = "-";
pub const EMPTY_STRING_MARKER: &str = "\"\"";

/// Renders a value to its canonical display string.
pub fn render(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Renders a named property of a record, or [`ABSENT_MARKER`] if it is missing.
pub fn render_property(record: &Record, name: &str) -> String {
    match record.value(name) {
        Some(value) => render(value),
        None => ABSENT_MARKER.to_string(),
    }
}

/// What a table cell holds, so a UI can tell the `NULL` and `-` markers apart
/// from string data that happens to read the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Value,
    Null,
    Absent,
}

pub fn cell_kind(record: &Record, name: &str) -> CellKind {
    match record.value(name) {
        None => CellKind::Absent,
        Some(Value::Null) => CellKind::Null,
        Some(_) => CellKind::Value,
    }
}

/// Cell kinds of one row, parallel to [`render_row`].
pub fn row_kinds(record: &Record, headers: &[Header]) -> Vec<CellKind> {
    headers
        .iter()
        .map(|header| cell_kind(record, &header.name))
        .collect()
}

/// Renders one table row: a cell per header, in header order.
pub fn render_row(record: &Record, headers: &[Header]) -> Vec<String> {
    headers
        .iter()
        .map(|header| render_property(record, &header.name))
        .collect()
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str(NULL_MARKER),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int64(i) => out.push_str(&i.to_string()),
        Value::Float64(f) => out.push_str(&format_float(*f)),
        Value::String(s) if s.is_empty() => out.push_str(EMPTY_STRING_MARKER),
        Value::String(s) => out.push_str(s),
        Value::Bytes(bytes) => {
            out.push_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        Value::Timestamp(ts) => out.push_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
        Value::GeoPoint(point) => out.push_str(&format!(
            "Lat: {:.6}, Lng: {:.6}",
            point.latitude, point.longitude
        )),
        Value::KeyRef(key) => out.push_str(key.as_str()),
        Value::Record(record) => {
            out.push('{');
            for property in record.iter() {
                out.push_str(&property.name);
                out.push(':');
                write_value(out, &property.value);
                out.push_str(", ");
            }
            out.push('}');
        }
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
    }
}

/// Shortest decimal that parses back to the same `f64`. Switches to exponent
/// notation outside `[1e-7, 1e21)`.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    let magnitude = f.abs();
    if magnitude != 0.0 && !(1e-7..1e21).contains(&magnitude) {
        format!("{f:e}")
    } else {
        format!("{f}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

/// A property with its value already stringified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayProperty {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub indexed: bool,
}

/// A record flattened to display strings, keyed by property name.
pub type DisplayRecord = HashMap<String, DisplayProperty>;

/// Stringifies every property of a record.
pub fn to_display_record(record: &Record) -> DisplayRecord {
    record
        .iter()
        .map(|property| {
            (
                property.name.clone(),
                DisplayProperty {
                    name: property.name.clone(),
                    value: render(&property.value),
                    type_name: property.type_tag.clone(),
                    indexed: property.indexed,
                },
            )
        })
        .collect()
}
