//! # Value Model
//!
//! Every store value that reaches the browser is reduced to one of the eleven
//! [`Value`] variants below. The set is closed: the loader rejects anything it
//! cannot classify instead of guessing, so downstream code (stringifier, header
//! inference, renderers) can match exhaustively.
//!
//! A [`Record`] is an ordered association of [`Property`] entries. Insertion
//! order is the order the store delivered the properties in, which keeps nested
//! record rendering reproducible.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Name of the synthetic identity property injected into every loaded record.
pub const KEY_PROPERTY: &str = "key";

/// The store's canonical identifier for an entity, e.g. `Fruit/1` or
/// `Basket/7/Fruit/apple` for a child entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyRef(String);

impl KeyRef {
    pub fn new(canonical: impl Into<String>) -> Self {
        Self(canonical.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A normalized property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<FixedOffset>),
    GeoPoint(GeoPoint),
    KeyRef(KeyRef),
    Record(Record),
    List(Vec<Value>),
}

impl Value {
    /// Label surfaced to callers as column type metadata.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::GeoPoint(_) => "geopoint",
            Value::KeyRef(_) => "key",
            Value::Record(_) => "record",
            Value::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: Value,
    pub type_tag: String,
    pub indexed: bool,
}

impl Property {
    pub fn new(name: impl Into<String>, value: Value, indexed: bool) -> Self {
        let type_tag = value.type_tag().to_string();
        Self {
            name: name.into(),
            value,
            type_tag,
            indexed,
        }
    }
}

/// Ordered, name-unique collection of properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    properties: Vec<Property>,
    positions: HashMap<String, usize>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a property. A property with the same name is replaced in place,
    /// keeping its original position.
    pub fn insert(&mut self, property: Property) {
        match self.positions.get(&property.name) {
            Some(&pos) => self.properties[pos] = property,
            None => {
                self.positions
                    .insert(property.name.clone(), self.properties.len());
                self.properties.push(property);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.positions.get(name).map(|&pos| &self.properties[pos])
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).map(|p| &p.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// The synthetic identity of a loaded record.
    pub fn key(&self) -> Option<&KeyRef> {
        match self.value(KEY_PROPERTY) {
            Some(Value::KeyRef(key)) => Some(key),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn clear(&mut self) {
        self.properties.clear();
        self.positions.clear();
    }
}

impl FromIterator<Property> for Record {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        let mut record = Record::new();
        for property in iter {
            record.insert(property);
        }
        record
    }
}

/// Inferred column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Header {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl Header {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Sort direction of the active query. Cycles `Unset → Descending → Ascending → Unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Unset,
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn next(self) -> Self {
        match self {
            SortDirection::Unset => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
            SortDirection::Ascending => SortDirection::Unset,
        }
    }

    /// Wire form handed to the store.
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Unset => "",
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
