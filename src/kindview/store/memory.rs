use super::{is_system_kind, scan, DataStore, QueryBatch, QueryRequest};
use crate::error::{BrowseError, Result};
use crate::load::RawEntity;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// In-memory storage for testing and development.
/// Does NOT persist data.
///
/// Counts every `query` call and can be told to fail upcoming queries, which
/// is how the pagination tests observe store traffic.
#[derive(Default)]
pub struct InMemoryStore {
    kinds: BTreeMap<String, Vec<RawEntity>>,
    queries: Cell<usize>,
    pending_failures: Cell<usize>,
    last_request: RefCell<Option<QueryRequest>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: &str, entity: RawEntity) {
        self.kinds.entry(kind.to_string()).or_default().push(entity);
    }

    /// Number of `query` calls served (or failed) so far.
    pub fn query_count(&self) -> usize {
        self.queries.get()
    }

    /// Makes the next `count` queries fail with a store error.
    pub fn fail_next_queries(&self, count: usize) {
        self.pending_failures.set(count);
    }

    pub fn last_request(&self) -> Option<QueryRequest> {
        self.last_request.borrow().clone()
    }
}

impl DataStore for InMemoryStore {
    fn list_kinds(&self) -> Result<Vec<String>> {
        Ok(self
            .kinds
            .keys()
            .filter(|kind| !is_system_kind(kind))
            .cloned()
            .collect())
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryBatch> {
        self.queries.set(self.queries.get() + 1);
        *self.last_request.borrow_mut() = Some(request.clone());

        let failures = self.pending_failures.get();
        if failures > 0 {
            self.pending_failures.set(failures - 1);
            return Err(BrowseError::store("injected failure"));
        }

        let rows = self.kinds.get(&request.kind).map(Vec::as_slice).unwrap_or(&[]);
        scan::run(rows, request)
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::load::RawProperty;
    use crate::model::KeyRef;
    use serde_json::{json, Value as Json};

    pub struct StoreFixture {
        pub store: InMemoryStore,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
            }
        }

        /// Adds `count` numbered entities `kind/1..=count` with `name` and `rank` properties.
        /// Ids are zero-padded so key order matches numeric order.
        pub fn with_entities(mut self, kind: &str, count: usize) -> Self {
            for i in 1..=count {
                let key = KeyRef::new(format!("{kind}/{i:04}"));
                let props = vec![
                    RawProperty::new("name", json!({"stringValue": format!("{kind} {i}")}), true),
                    RawProperty::new("rank", json!({"integerValue": i.to_string()}), true),
                ];
                self.store.insert(kind, RawEntity::new(key, props));
            }
            self
        }

        /// Adds a single entity from `(name, wire value)` pairs.
        pub fn with_entity(mut self, kind: &str, id: &str, props: Vec<(&str, Json)>) -> Self {
            let key = KeyRef::new(format!("{kind}/{id}"));
            let props = props
                .into_iter()
                .map(|(name, value)| RawProperty::new(name, value, true))
                .collect();
            self.store.insert(kind, RawEntity::new(key, props));
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::StoreFixture;
    use super::*;

    #[test]
    fn lists_user_kinds_only() {
        let fixture = StoreFixture::new()
            .with_entities("Fruit", 1)
            .with_entities("Basket", 1)
            .with_entities("__Stat_Total__", 1);
        assert_eq!(fixture.store.list_kinds().unwrap(), vec!["Basket", "Fruit"]);
    }

    #[test]
    fn unknown_kind_is_empty() {
        let store = InMemoryStore::new();
        let batch = store.query(&QueryRequest::new("Nothing", 10)).unwrap();
        assert!(batch.entities.is_empty());
        assert!(batch.next_cursor.is_empty());
    }

    #[test]
    fn counts_queries_and_injects_failures() {
        let fixture = StoreFixture::new().with_entities("Fruit", 3);
        let store = fixture.store;
        store.fail_next_queries(1);

        assert!(store.query(&QueryRequest::new("Fruit", 2)).is_err());
        let batch = store.query(&QueryRequest::new("Fruit", 2)).unwrap();
        assert_eq!(batch.entities.len(), 2);
        assert_eq!(store.query_count(), 2);
        assert_eq!(store.last_request().unwrap().limit, 2);
    }
}
