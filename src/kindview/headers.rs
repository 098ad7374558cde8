//! Column inference over a batch of heterogeneous records.
//!
//! Records of the same kind need not share properties, so the table's columns
//! are the union of every property name seen in the batch. The type shown for a
//! column is the type tag of its first occurrence. `key` always leads; the other
//! columns follow in first-seen order.

use crate::model::{Header, Record, KEY_PROPERTY};
use std::collections::HashSet;

pub fn infer_headers<'a, I>(batch: I) -> Vec<Header>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut key_header = None;
    let mut headers = Vec::new();

    for record in batch {
        for property in record.iter() {
            if !seen.insert(property.name.as_str()) {
                continue;
            }
            let header = Header::new(&property.name, &property.type_tag);
            if property.name == KEY_PROPERTY {
                key_header = Some(header);
            } else {
                headers.push(header);
            }
        }
    }

    if let Some(key) = key_header {
        headers.insert(0, key);
    }
    headers
}
