//! Cloud Datastore emulator over its REST API (`v1/projects/{project}:runQuery`).
//!
//! Request bodies and response parsing are plain functions over JSON so they
//! can be tested without an emulator; [`EmulatorStore`] only adds the HTTP
//! round trip.

use super::{is_system_kind, wire, DataStore, QueryBatch, QueryRequest};
use crate::config::BrowserConfig;
use crate::error::{BrowseError, Result};
use crate::load::RawEntity;
use crate::model::SortDirection;
use serde_json::{json, Map, Value as Json};
use std::time::Duration;

const KIND_METADATA: &str = "__kind__";
const NO_MORE_RESULTS: &str = "NO_MORE_RESULTS";
const NOT_FINISHED: &str = "NOT_FINISHED";
/// Upper bound on `__kind__` pages, in case the emulator keeps returning a cursor.
const MAX_KIND_PAGES: usize = 64;
/// Upper bound on follow-up `runQuery` calls while filling one page.
const MAX_CONTINUATIONS: usize = 64;

pub struct EmulatorStore {
    client: reqwest::blocking::Client,
    url: String,
    project_id: String,
    namespace: Option<String>,
}

impl EmulatorStore {
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BrowseError::store(format!("cannot build HTTP client: {e}")))?;

        let url = format!(
            "{}/v1/projects/{}:runQuery",
            config.endpoint(),
            config.project_id
        );
        tracing::debug!(
            %url,
            emulator_host = %config.emulator_host,
            emulator_host_path = %config.emulator_host_path,
            dataset = %config.dataset_id,
            "configured emulator store"
        );

        Ok(Self {
            client,
            url,
            project_id: config.project_id.clone(),
            namespace: config.namespace.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn run_query(&self, body: &Json) -> Result<Json> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .map_err(|e| {
                tracing::warn!(url = %self.url, error = %e, "runQuery request failed");
                BrowseError::store(format!("request to {} failed: {}", self.url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            tracing::warn!(url = %self.url, %status, "runQuery rejected");
            return Err(BrowseError::store(format!(
                "{} returned {}: {}",
                self.url,
                status,
                detail.trim()
            )));
        }

        response
            .json::<Json>()
            .map_err(|e| BrowseError::store(format!("cannot decode runQuery response: {e}")))
    }
}

impl DataStore for EmulatorStore {
    fn list_kinds(&self) -> Result<Vec<String>> {
        let mut kinds = Vec::new();
        let mut cursor = String::new();

        for _ in 0..MAX_KIND_PAGES {
            let body = kinds_body(&self.project_id, self.namespace.as_deref(), &cursor);
            let response = self.run_query(&body)?;
            let (page, next) = parse_kinds(&response)?;
            kinds.extend(page);
            if next.is_empty() || next == cursor {
                break;
            }
            cursor = next;
        }

        kinds.retain(|kind| !is_system_kind(kind));
        Ok(kinds)
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryBatch> {
        collect_batch(request, |page| {
            tracing::debug!(
                kind = %page.kind,
                sort_key = %page.sort_key,
                direction = %page.direction,
                limit = page.limit,
                cursor = %page.cursor,
                "runQuery"
            );
            let body = query_body(&self.project_id, self.namespace.as_deref(), page);
            self.run_query(&body)
        })
    }
}

fn partition(project_id: &str, namespace: Option<&str>) -> Json {
    let mut partition = Map::new();
    partition.insert("projectId".into(), json!(project_id));
    if let Some(ns) = namespace {
        partition.insert("namespaceId".into(), json!(ns));
    }
    Json::Object(partition)
}

/// Body of a `runQuery` call for one page of `request`.
pub fn query_body(project_id: &str, namespace: Option<&str>, request: &QueryRequest) -> Json {
    let mut query = Map::new();
    query.insert("kind".into(), json!([{ "name": request.kind }]));

    if request.is_sorted() {
        let direction = match request.direction {
            SortDirection::Descending => "DESCENDING",
            _ => "ASCENDING",
        };
        query.insert(
            "order".into(),
            json!([{ "property": { "name": request.sort_key }, "direction": direction }]),
        );
    }
    if request.limit > 0 {
        query.insert("limit".into(), json!(request.limit));
    }
    if !request.cursor.is_empty() {
        query.insert("startCursor".into(), json!(request.cursor));
    }

    json!({
        "partitionId": partition(project_id, namespace),
        "query": Json::Object(query),
    })
}

/// Keys-only query over the `__kind__` metadata kind.
pub fn kinds_body(project_id: &str, namespace: Option<&str>, cursor: &str) -> Json {
    let mut query = Map::new();
    query.insert("kind".into(), json!([{ "name": KIND_METADATA }]));
    query.insert(
        "projection".into(),
        json!([{ "property": { "name": "__key__" } }]),
    );
    if !cursor.is_empty() {
        query.insert("startCursor".into(), json!(cursor));
    }

    json!({
        "partitionId": partition(project_id, namespace),
        "query": Json::Object(query),
    })
}

fn batch_of(response: &Json) -> Result<&Json> {
    response
        .get("batch")
        .ok_or_else(|| BrowseError::store("runQuery response has no batch"))
}

fn entity_results(batch: &Json) -> &[Json] {
    batch
        .get("entityResults")
        .and_then(Json::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn end_cursor(batch: &Json) -> String {
    if more_results(batch) == NO_MORE_RESULTS {
        return String::new();
    }
    batch
        .get("endCursor")
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string()
}

fn more_results(batch: &Json) -> &str {
    batch
        .get("moreResults")
        .and_then(Json::as_str)
        .unwrap_or_default()
}

/// One `runQuery` response: its rows, where it stopped and the server's
/// `moreResults` verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchChunk {
    pub entities: Vec<RawEntity>,
    pub end_cursor: String,
    pub more_results: String,
}

impl BatchChunk {
    /// The server stopped early and more rows may follow from `end_cursor`.
    pub fn is_not_finished(&self) -> bool {
        self.more_results == NOT_FINISHED
    }

    pub fn is_exhausted(&self) -> bool {
        self.more_results == NO_MORE_RESULTS
    }
}

/// Maps one `runQuery` response to its raw entities and cursor.
pub fn parse_chunk(response: &Json) -> Result<BatchChunk> {
    let batch = batch_of(response)?;
    let entities = entity_results(batch)
        .iter()
        .map(|result| {
            let entity = result
                .get("entity")
                .ok_or_else(|| BrowseError::store("entity result without entity"))?;
            wire::entity_from_json(entity)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BatchChunk {
        entities,
        end_cursor: batch
            .get("endCursor")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string(),
        more_results: more_results(batch).to_string(),
    })
}

/// Fills one page of `request`, calling `run` again from the last end cursor
/// while the server answers `NOT_FINISHED` and the page is not yet full.
///
/// The returned cursor is empty only when the server reported
/// `NO_MORE_RESULTS`, when a batch came back short without `NOT_FINISHED`, or
/// when the end cursor stopped moving.
pub fn collect_batch<F>(request: &QueryRequest, mut run: F) -> Result<QueryBatch>
where
    F: FnMut(&QueryRequest) -> Result<Json>,
{
    let mut entities = Vec::new();
    let mut pending = request.clone();

    for _ in 0..MAX_CONTINUATIONS {
        let chunk = parse_chunk(&run(&pending)?)?;
        let stalled = chunk.end_cursor.is_empty() || chunk.end_cursor == pending.cursor;
        let not_finished = chunk.is_not_finished();
        let exhausted = chunk.is_exhausted();
        entities.extend(chunk.entities);
        let filled = request.limit > 0 && entities.len() >= request.limit;

        if not_finished && !filled && !stalled {
            tracing::debug!(
                rows = entities.len(),
                limit = request.limit,
                "runQuery not finished, continuing"
            );
            if request.limit > 0 {
                pending.limit = request.limit - entities.len();
            }
            pending.cursor = chunk.end_cursor;
            continue;
        }

        if not_finished && stalled && !filled {
            tracing::warn!(cursor = %pending.cursor, "runQuery stopped advancing");
        }
        let short = entities.is_empty() || (request.limit > 0 && !filled);
        let next_cursor = if exhausted || stalled || (short && !not_finished) {
            String::new()
        } else {
            chunk.end_cursor
        };
        return Ok(QueryBatch {
            entities,
            next_cursor,
        });
    }

    tracing::warn!(
        rows = entities.len(),
        "runQuery still not finished after {MAX_CONTINUATIONS} calls"
    );
    Ok(QueryBatch {
        entities,
        next_cursor: pending.cursor,
    })
}

/// Kind names from a `__kind__` response, plus the cursor for the next page.
pub fn parse_kinds(response: &Json) -> Result<(Vec<String>, String)> {
    let batch = batch_of(response)?;
    let results = entity_results(batch);

    let kinds = results
        .iter()
        .filter_map(|result| {
            result
                .get("entity")?
                .get("key")?
                .get("path")?
                .as_array()?
                .last()?
                .get("name")?
                .as_str()
                .map(str::to_string)
        })
        .collect();

    let next = if results.is_empty() {
        String::new()
    } else {
        end_cursor(batch)
    };
    Ok((kinds, next))
}
