use super::{is_system_kind, scan, wire, DataStore, QueryBatch, QueryRequest};
use crate::error::{BrowseError, Result};
use crate::load::RawEntity;
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Browses a JSON entity dump on disk.
///
/// The file holds entities in the store's REST shape, either wrapped as
/// `{"entities": [...]}` or as a bare array:
///
/// ```json
/// {"entities": [
///   {"key": {"path": [{"kind": "Fruit", "id": "1"}]},
///    "properties": {"name": {"stringValue": "Apple"}}}
/// ]}
/// ```
///
/// The dump is re-read on every call, so edits show up on the next fetch.
pub struct FileStore {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DumpFile {
    Wrapped { entities: Vec<Json> },
    Bare(Vec<Json>),
}

impl DumpFile {
    fn into_entities(self) -> Vec<Json> {
        match self {
            DumpFile::Wrapped { entities } | DumpFile::Bare(entities) => entities,
        }
    }
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the dump into `(kind, entity)` pairs.
    fn load(&self) -> Result<Vec<(String, RawEntity)>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            BrowseError::store(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let dump: DumpFile = serde_json::from_str(&content).map_err(|e| {
            BrowseError::store(format!("cannot parse {}: {}", self.path.display(), e))
        })?;

        dump.into_entities()
            .iter()
            .map(|entity| {
                let kind = entity
                    .get("key")
                    .and_then(wire::kind_from_json)
                    .ok_or_else(|| BrowseError::store("entity key has no kind"))?
                    .to_string();
                Ok((kind, wire::entity_from_json(entity)?))
            })
            .collect()
    }
}

impl DataStore for FileStore {
    fn list_kinds(&self) -> Result<Vec<String>> {
        let kinds: BTreeSet<String> = self
            .load()?
            .into_iter()
            .map(|(kind, _)| kind)
            .filter(|kind| !is_system_kind(kind))
            .collect();
        Ok(kinds.into_iter().collect())
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryBatch> {
        tracing::debug!(path = %self.path.display(), kind = %request.kind, "scanning dump file");
        let rows = self.load()?;
        scan::run(
            rows.iter()
                .filter(|(kind, _)| *kind == request.kind)
                .map(|(_, entity)| entity),
            request,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_dump(dir: &TempDir, content: &Json) -> PathBuf {
        let path = dir.path().join("dump.json");
        fs::write(&path, serde_json::to_string_pretty(content).unwrap()).unwrap();
        path
    }

    fn entity(kind: &str, id: &str, name: &str) -> Json {
        json!({
            "key": {"path": [{"kind": kind, "id": id}]},
            "properties": {"name": {"stringValue": name}}
        })
    }

    #[test]
    fn lists_kinds_from_dump() {
        let dir = TempDir::new().unwrap();
        let path = write_dump(
            &dir,
            &json!({"entities": [
                entity("Fruit", "1", "Apple"),
                entity("Basket", "1", "Wicker"),
                entity("Fruit", "2", "Pear"),
            ]}),
        );
        let store = FileStore::new(path);
        assert_eq!(store.list_kinds().unwrap(), vec!["Basket", "Fruit"]);
    }

    #[test]
    fn bare_array_dump_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = write_dump(&dir, &json!([entity("Fruit", "1", "Apple")]));
        let store = FileStore::new(path);

        let batch = store.query(&QueryRequest::new("Fruit", 10)).unwrap();
        assert_eq!(batch.entities.len(), 1);
        assert_eq!(batch.entities[0].key.as_str(), "Fruit/1");
    }

    #[test]
    fn query_filters_by_kind_and_pages() {
        let dir = TempDir::new().unwrap();
        let path = write_dump(
            &dir,
            &json!({"entities": [
                entity("Fruit", "1", "Apple"),
                entity("Basket", "1", "Wicker"),
                entity("Fruit", "2", "Pear"),
                entity("Fruit", "3", "Plum"),
            ]}),
        );
        let store = FileStore::new(path);

        let first = store.query(&QueryRequest::new("Fruit", 2)).unwrap();
        assert_eq!(first.entities.len(), 2);
        let rest = store
            .query(&QueryRequest::new("Fruit", 2).starting_at(first.next_cursor))
            .unwrap();
        assert_eq!(rest.entities.len(), 1);
        assert!(rest.next_cursor.is_empty());
    }

    #[test]
    fn missing_file_is_a_store_failure() {
        let store = FileStore::new("/definitely/not/here.json");
        assert!(matches!(
            store.list_kinds(),
            Err(BrowseError::StoreQueryFailed(_))
        ));
    }
}
