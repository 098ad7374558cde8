//! Query evaluation over rows held in memory.
//!
//! Mirrors what the real store does for a single-kind query: an optional sort
//! on one property (rows lacking the property are skipped, as the store's index
//! would not contain them), key order otherwise, then an offset/limit window
//! addressed by an opaque cursor.

use super::wire::compare_values;
use super::{QueryBatch, QueryRequest};
use crate::error::{BrowseError, Result};
use crate::load::RawEntity;
use crate::model::SortDirection;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCursor {
    pub offset: usize,
}

impl ScanCursor {
    pub fn encode(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        base64::engine::general_purpose::STANDARD.encode(json.as_bytes())
    }

    pub fn decode(cursor: &str) -> Option<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(cursor)
            .ok()?;
        let json = String::from_utf8(bytes).ok()?;
        serde_json::from_str(&json).ok()
    }
}

/// Runs `request` over `rows`, which must already be restricted to the requested kind.
pub fn run<'a, I>(rows: I, request: &QueryRequest) -> Result<QueryBatch>
where
    I: IntoIterator<Item = &'a RawEntity>,
{
    let offset = if request.cursor.is_empty() {
        0
    } else {
        ScanCursor::decode(&request.cursor)
            .ok_or_else(|| BrowseError::store(format!("invalid cursor '{}'", request.cursor)))?
            .offset
    };

    let mut rows: Vec<&RawEntity> = rows.into_iter().collect();
    if request.is_sorted() {
        rows.retain(|row| row.property(&request.sort_key).is_some());
        rows.sort_by(|a, b| {
            let va = a.property(&request.sort_key).map(|p| &p.value);
            let vb = b.property(&request.sort_key).map(|p| &p.value);
            let by_value = match (va, vb) {
                (Some(x), Some(y)) => compare_values(x, y),
                _ => std::cmp::Ordering::Equal,
            };
            let ordered = match request.direction {
                SortDirection::Descending => by_value.reverse(),
                _ => by_value,
            };
            ordered.then_with(|| a.key.cmp(&b.key))
        });
    } else {
        rows.sort_by(|a, b| a.key.cmp(&b.key));
    }

    let limit = if request.limit == 0 {
        rows.len()
    } else {
        request.limit
    };
    let end = offset.saturating_add(limit).min(rows.len());
    let start = offset.min(end);
    let entities: Vec<RawEntity> = rows[start..end].iter().map(|row| (*row).clone()).collect();

    let next_cursor = if end < rows.len() {
        ScanCursor { offset: end }.encode()
    } else {
        String::new()
    };

    Ok(QueryBatch {
        entities,
        next_cursor,
    })
}
