//! # Storage Layer
//!
//! The browser never talks to a database directly. Everything goes through the
//! [`DataStore`] trait, which exposes the two calls a read-only browser needs:
//! listing kinds and running one page of a (possibly sorted) kind query.
//!
//! ## Contract
//!
//! - `cursor == ""` starts at the beginning of the result set.
//! - A returned `next_cursor == ""` means there is nothing after this batch.
//! - Cursors are opaque and only valid for the kind and sort they were issued
//!   under. Callers must drop them whenever either changes.
//! - Rows come back raw ([`RawEntity`]); normalization is the caller's job.
//!
//! ## Implementations
//!
//! - [`emulator::EmulatorStore`]: Cloud Datastore emulator over its REST API
//! - [`fs::FileStore`]: a JSON entity dump on disk, re-read on every call
//! - [`memory::InMemoryStore`]: in-process store for tests and fixtures
//!
//! The file and memory stores share the query semantics in [`scan`].

use crate::error::Result;
use crate::load::RawEntity;
use crate::model::SortDirection;

pub mod emulator;
pub mod fs;
pub mod memory;
pub mod scan;
pub mod wire;

/// One page request against a kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub kind: String,
    pub sort_key: String,
    pub direction: SortDirection,
    pub limit: usize,
    pub cursor: String,
}

impl QueryRequest {
    pub fn new(kind: impl Into<String>, limit: usize) -> Self {
        Self {
            kind: kind.into(),
            sort_key: String::new(),
            direction: SortDirection::Unset,
            limit,
            cursor: String::new(),
        }
    }

    pub fn sorted_by(mut self, sort_key: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_key = sort_key.into();
        self.direction = direction;
        self
    }

    pub fn starting_at(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = cursor.into();
        self
    }

    /// Whether the request asks the store to order by a property.
    pub fn is_sorted(&self) -> bool {
        !self.sort_key.is_empty() && self.direction != SortDirection::Unset
    }
}

/// One batch of raw rows plus the continuation cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBatch {
    pub entities: Vec<RawEntity>,
    pub next_cursor: String,
}

/// Read-only access to a schemaless kind/entity store.
pub trait DataStore {
    /// Kind names, in the order the store reports them.
    fn list_kinds(&self) -> Result<Vec<String>>;

    /// Runs one page of a kind query.
    fn query(&self, request: &QueryRequest) -> Result<QueryBatch>;
}

impl<S: DataStore + ?Sized> DataStore for Box<S> {
    fn list_kinds(&self) -> Result<Vec<String>> {
        (**self).list_kinds()
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryBatch> {
        (**self).query(request)
    }
}

/// Kinds that the store uses for its own bookkeeping (`__kind__`, `__Stat_Total__`, ...).
pub fn is_system_kind(kind: &str) -> bool {
    kind.starts_with("__")
}
