//! # Pagination / Sort Controller
//!
//! One controller drives one browsing session over a single kind. It owns the
//! buffer of every record fetched so far and shows a page-sized window of it:
//!
//! ```text
//! Unselected --select_kind--> Selected (empty buffer) --fetch--> Paged
//!                                  ^                               |
//!                                  +---- select_kind / toggle_sort +
//! ```
//!
//! Moving backwards only re-slices the buffer. Moving forwards re-slices while
//! buffered rows remain and fetches one store batch (of `page_size` rows) once
//! the window reaches the end of the buffer.
//!
//! Any change of kind or sort discards the buffer and the cursor: store cursors
//! are only meaningful for the query that produced them.
//!
//! Failed operations leave the state exactly as it was.

use crate::display::{render_row, row_kinds, CellKind};
use crate::error::{BrowseError, Result};
use crate::headers::infer_headers;
use crate::load::normalize_entities;
use crate::model::{Header, Record, SortDirection};
use crate::store::{DataStore, QueryRequest};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageState {
    pub kind: Option<String>,
    pub sort_key: String,
    pub direction: SortDirection,
    pub cursor: String,
    pub buffer: Vec<Record>,
    /// 1-based; 0 until the first page has been fetched.
    pub current_page: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// Everything a UI needs to draw the current page.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageView {
    pub kind: String,
    pub sort_key: String,
    pub direction: String,
    pub page: usize,
    pub headers: Vec<Header>,
    pub rows: Vec<Vec<String>>,
    /// Parallel to `rows`: whether each cell is data, `NULL` or absent.
    pub cell_kinds: Vec<Vec<CellKind>>,
    /// 1-based index of the first visible row in the buffer, 0 when empty.
    pub first_row: usize,
    pub last_row: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Clone)]
pub struct PageController {
    state: PageState,
    page_size: usize,
}

impl PageController {
    pub fn new(page_size: usize) -> Self {
        Self {
            state: PageState::default(),
            page_size: page_size.max(1),
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn kind(&self) -> Option<&str> {
        self.state.kind.as_deref()
    }

    pub fn current_page(&self) -> usize {
        self.state.current_page
    }

    pub fn has_next_page(&self) -> bool {
        self.state.has_next_page
    }

    pub fn has_prev_page(&self) -> bool {
        self.state.has_prev_page
    }

    /// Switches to `kind`, discarding everything fetched so far.
    pub fn select_kind(&mut self, kind: impl Into<String>) {
        let kind = kind.into();
        tracing::debug!(%kind, "select kind");
        self.state = PageState {
            kind: Some(kind),
            ..PageState::default()
        };
    }

    /// Advances the sort direction one step and restarts from an empty buffer.
    ///
    /// The direction cycles regardless of `sort_key`; when it comes back to
    /// unset, the sort key is cleared as well.
    pub fn toggle_sort(&mut self, sort_key: &str) -> Result<()> {
        let kind = self.state.kind.take().ok_or(BrowseError::NoKindSelected)?;
        let direction = self.state.direction.next();
        let sort_key = if direction == SortDirection::Unset {
            String::new()
        } else {
            sort_key.to_string()
        };
        tracing::debug!(%kind, %sort_key, %direction, "toggle sort");

        self.state = PageState {
            kind: Some(kind),
            sort_key,
            direction,
            ..PageState::default()
        };
        Ok(())
    }

    /// Rows visible on the current page.
    pub fn visible(&self) -> &[Record] {
        if self.state.current_page == 0 {
            return &[];
        }
        let len = self.state.buffer.len();
        let start = ((self.state.current_page - 1) * self.page_size).min(len);
        let end = (self.state.current_page * self.page_size).min(len);
        &self.state.buffer[start..end]
    }

    /// Columns of the current page.
    pub fn headers(&self) -> Vec<Header> {
        infer_headers(self.visible())
    }

    pub fn page_view(&self) -> Result<PageView> {
        let kind = self
            .state
            .kind
            .clone()
            .ok_or(BrowseError::NoKindSelected)?;
        let visible = self.visible();
        let headers = infer_headers(visible);
        let rows = visible
            .iter()
            .map(|record| render_row(record, &headers))
            .collect();
        let cell_kinds = visible
            .iter()
            .map(|record| row_kinds(record, &headers))
            .collect();
        let first_row = if visible.is_empty() {
            0
        } else {
            (self.state.current_page - 1) * self.page_size + 1
        };

        Ok(PageView {
            kind,
            sort_key: self.state.sort_key.clone(),
            direction: self.state.direction.as_str().to_string(),
            page: self.state.current_page,
            headers,
            rows,
            cell_kinds,
            first_row,
            last_row: first_row + visible.len().saturating_sub(1),
            has_next_page: self.state.has_next_page,
            has_prev_page: self.state.has_prev_page,
        })
    }

    fn exhausted(&self) -> bool {
        self.state.current_page > 0 && self.state.cursor.is_empty()
    }

    fn buffered_ahead(&self) -> bool {
        self.state.current_page * self.page_size < self.state.buffer.len()
    }

    fn refresh_flags(&mut self) {
        self.state.has_prev_page = self.state.current_page > 1;
        self.state.has_next_page = self.buffered_ahead() || !self.state.cursor.is_empty();
    }

    /// Fetches one batch from the store and shows it as the next page.
    ///
    /// Only valid at the end of the buffer. Returns the number of records
    /// appended; an empty batch after the first page appends nothing and just
    /// marks the result set as exhausted.
    pub fn fetch_next_page<S: DataStore + ?Sized>(&mut self, store: &S) -> Result<usize> {
        let kind = self
            .state
            .kind
            .clone()
            .ok_or(BrowseError::NoKindSelected)?;
        if self.exhausted() {
            return Err(BrowseError::InvalidPageState(
                "no more results to fetch".to_string(),
            ));
        }
        if self.buffered_ahead() {
            return Err(BrowseError::InvalidPageState(
                "buffered pages remain ahead of the current page".to_string(),
            ));
        }

        let request = QueryRequest::new(kind, self.page_size)
            .sorted_by(self.state.sort_key.clone(), self.state.direction)
            .starting_at(self.state.cursor.clone());
        tracing::debug!(
            kind = %request.kind,
            page = self.state.current_page + 1,
            cursor = %request.cursor,
            "fetching page"
        );

        let batch = store.query(&request).map_err(|e| {
            tracing::warn!(kind = %request.kind, error = %e, "store query failed");
            match e {
                BrowseError::StoreQueryFailed(_) => e,
                other => BrowseError::StoreQueryFailed(other.to_string()),
            }
        })?;
        let records = normalize_entities(&batch.entities)?;

        let appended = records.len();
        self.state.cursor = batch.next_cursor;
        if appended > 0 || self.state.current_page == 0 {
            self.state.buffer.extend(records);
            self.state.current_page += 1;
        }
        self.refresh_flags();

        tracing::debug!(
            page = self.state.current_page,
            appended,
            buffered = self.state.buffer.len(),
            has_next = self.state.has_next_page,
            "page fetched"
        );
        Ok(appended)
    }

    /// Moves forward one page, fetching only when the buffer runs out.
    pub fn request_next_page<S: DataStore + ?Sized>(&mut self, store: &S) -> Result<()> {
        if self.state.kind.is_none() {
            return Err(BrowseError::NoKindSelected);
        }
        if self.state.current_page == 0 {
            self.fetch_next_page(store)?;
            return Ok(());
        }
        if self.buffered_ahead() {
            self.state.current_page += 1;
            self.refresh_flags();
            tracing::debug!(page = self.state.current_page, "next page from buffer");
            return Ok(());
        }
        if self.exhausted() {
            return Err(BrowseError::InvalidPageState(
                "already on the last page".to_string(),
            ));
        }
        if self.fetch_next_page(store)? == 0 {
            return Err(BrowseError::InvalidPageState(
                "already on the last page".to_string(),
            ));
        }
        Ok(())
    }

    /// Moves back one page. Never touches the store.
    pub fn request_prev_page(&mut self) -> Result<()> {
        if self.state.kind.is_none() {
            return Err(BrowseError::NoKindSelected);
        }
        if !self.state.has_prev_page {
            return Err(BrowseError::InvalidPageState(
                "already on the first page".to_string(),
            ));
        }
        self.state.current_page -= 1;
        self.refresh_flags();
        tracing::debug!(page = self.state.current_page, "previous page from buffer");
        Ok(())
    }

    /// Pages forward until `page` is shown or the results run out.
    pub fn goto_page<S: DataStore + ?Sized>(&mut self, store: &S, page: usize) -> Result<()> {
        let page = page.max(1);
        while self.state.current_page < page {
            match self.request_next_page(store) {
                Ok(()) => {}
                Err(BrowseError::InvalidPageState(_)) => {
                    return Err(BrowseError::InvalidPageState(format!(
                        "page {} is past the last page ({})",
                        page, self.state.current_page
                    )))
                }
                Err(e) => return Err(e),
            }
        }
        while self.state.current_page > page {
            self.request_prev_page()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::{RawEntity, RawProperty};
    use crate::model::{KeyRef, Value};
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::QueryBatch;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Replays canned batches in order and records what was asked.
    struct ScriptedStore {
        batches: RefCell<VecDeque<QueryBatch>>,
        requests: RefCell<Vec<QueryRequest>>,
        calls: Cell<usize>,
    }

    impl ScriptedStore {
        fn new(batches: Vec<QueryBatch>) -> Self {
            Self {
                batches: RefCell::new(batches.into()),
                requests: RefCell::new(Vec::new()),
                calls: Cell::new(0),
            }
        }
    }

    impl DataStore for ScriptedStore {
        fn list_kinds(&self) -> Result<Vec<String>> {
            Ok(vec!["Fruit".to_string()])
        }

        fn query(&self, request: &QueryRequest) -> Result<QueryBatch> {
            self.calls.set(self.calls.get() + 1);
            self.requests.borrow_mut().push(request.clone());
            Ok(self.batches.borrow_mut().pop_front().unwrap_or_default())
        }
    }

    fn batch(ids: &[u32], cursor: &str) -> QueryBatch {
        QueryBatch {
            entities: ids
                .iter()
                .map(|id| {
                    RawEntity::new(
                        KeyRef::new(format!("Fruit/{id}")),
                        vec![RawProperty::new("id", json!(id), true)],
                    )
                })
                .collect(),
            next_cursor: cursor.to_string(),
        }
    }

    fn visible_keys(controller: &PageController) -> Vec<String> {
        controller
            .visible()
            .iter()
            .map(|r| r.key().unwrap().to_string())
            .collect()
    }

    fn scenario_store() -> ScriptedStore {
        ScriptedStore::new(vec![
            batch(&[1, 2], "c1"),
            batch(&[3, 4], "c2"),
            batch(&[5], ""),
        ])
    }

    #[test]
    fn three_fetches_then_back_without_store_calls() {
        let store = scenario_store();
        let mut controller = PageController::new(2);
        controller.select_kind("Fruit");

        for _ in 0..3 {
            controller.fetch_next_page(&store).unwrap();
        }
        assert_eq!(controller.current_page(), 3);
        assert!(!controller.has_next_page());
        assert_eq!(visible_keys(&controller), vec!["Fruit/5"]);

        let calls = store.calls.get();
        controller.request_prev_page().unwrap();
        assert_eq!(controller.current_page(), 2);
        assert_eq!(visible_keys(&controller), vec!["Fruit/3", "Fruit/4"]);
        assert_eq!(store.calls.get(), calls);

        let cursors: Vec<String> = store
            .requests
            .borrow()
            .iter()
            .map(|r| r.cursor.clone())
            .collect();
        assert_eq!(cursors, vec!["", "c1", "c2"]);
    }

    #[test]
    fn next_after_prev_reuses_buffer() {
        let store = scenario_store();
        let mut controller = PageController::new(2);
        controller.select_kind("Fruit");
        controller.request_next_page(&store).unwrap();
        controller.request_next_page(&store).unwrap();
        controller.request_prev_page().unwrap();

        let calls = store.calls.get();
        controller.request_next_page(&store).unwrap();
        assert_eq!(store.calls.get(), calls);
        assert_eq!(visible_keys(&controller), vec!["Fruit/3", "Fruit/4"]);
        assert!(controller.has_next_page());
    }

    #[test]
    fn next_on_last_page_is_rejected_without_change() {
        let store = scenario_store();
        let mut controller = PageController::new(2);
        controller.select_kind("Fruit");
        controller.goto_page(&store, 3).unwrap();

        let before = controller.state().clone();
        let err = controller.request_next_page(&store).unwrap_err();
        assert!(matches!(err, BrowseError::InvalidPageState(_)));
        assert_eq!(controller.state(), &before);
        assert_eq!(store.calls.get(), 3);

        assert!(matches!(
            controller.fetch_next_page(&store),
            Err(BrowseError::InvalidPageState(_))
        ));
    }

    #[test]
    fn empty_batch_after_first_page_only_marks_exhaustion() {
        let store = ScriptedStore::new(vec![batch(&[1, 2], "c1"), batch(&[], "")]);
        let mut controller = PageController::new(2);
        controller.select_kind("Fruit");
        controller.request_next_page(&store).unwrap();
        assert!(controller.has_next_page());

        let err = controller.request_next_page(&store).unwrap_err();
        assert!(matches!(err, BrowseError::InvalidPageState(_)));
        assert_eq!(controller.current_page(), 1);
        assert!(!controller.has_next_page());
        assert_eq!(visible_keys(&controller), vec!["Fruit/1", "Fruit/2"]);
    }

    #[test]
    fn empty_kind_shows_one_empty_page() {
        let store = ScriptedStore::new(vec![]);
        let mut controller = PageController::new(2);
        controller.select_kind("Fruit");
        controller.request_next_page(&store).unwrap();

        assert_eq!(controller.current_page(), 1);
        assert!(controller.visible().is_empty());
        assert!(!controller.has_next_page());
        assert!(!controller.has_prev_page());
        let view = controller.page_view().unwrap();
        assert_eq!(view.first_row, 0);
        assert!(view.headers.is_empty());
    }

    #[test]
    fn page_count_is_ceil_of_total_over_size() {
        for (total, size) in [(5usize, 2usize), (4, 2), (1, 3), (7, 7), (10, 3)] {
            let fixture = StoreFixture::new().with_entities("Fruit", total);
            let mut controller = PageController::new(size);
            controller.select_kind("Fruit");

            let mut pages = 0;
            let mut seen = 0;
            while controller.request_next_page(&fixture.store).is_ok() {
                pages += 1;
                seen += controller.visible().len();
            }
            assert_eq!(pages, total.div_ceil(size), "total={total} size={size}");
            assert_eq!(seen, total);
        }
    }

    #[test]
    fn prev_then_next_reproduces_slice() {
        let fixture = StoreFixture::new().with_entities("Fruit", 9);
        let mut controller = PageController::new(4);
        controller.select_kind("Fruit");
        controller.goto_page(&fixture.store, 3).unwrap();
        controller.request_prev_page().unwrap();
        let page_two = visible_keys(&controller);

        let calls = fixture.store.query_count();
        controller.request_prev_page().unwrap();
        controller.request_next_page(&fixture.store).unwrap();
        assert_eq!(visible_keys(&controller), page_two);
        assert_eq!(fixture.store.query_count(), calls);
    }

    #[test]
    fn toggle_sort_cycles_and_resets() {
        let fixture = StoreFixture::new().with_entities("Fruit", 5);
        let mut controller = PageController::new(2);
        controller.select_kind("Fruit");

        let expected = [
            SortDirection::Descending,
            SortDirection::Ascending,
            SortDirection::Unset,
        ];
        for direction in expected {
            controller.goto_page(&fixture.store, 2).unwrap();
            controller.toggle_sort("rank").unwrap();

            let state = controller.state();
            assert_eq!(state.direction, direction);
            assert_eq!(state.current_page, 0);
            assert!(state.cursor.is_empty());
            assert!(state.buffer.is_empty());
            assert_eq!(state.kind.as_deref(), Some("Fruit"));
        }
        assert!(controller.state().sort_key.is_empty());
    }

    #[test]
    fn sorted_fetch_passes_sort_to_store() {
        let fixture = StoreFixture::new().with_entities("Fruit", 3);
        let mut controller = PageController::new(2);
        controller.select_kind("Fruit");
        controller.toggle_sort("rank").unwrap();
        controller.request_next_page(&fixture.store).unwrap();

        let request = fixture.store.last_request().unwrap();
        assert_eq!(request.sort_key, "rank");
        assert_eq!(request.direction, SortDirection::Descending);
        assert_eq!(request.limit, 2);
        assert_eq!(visible_keys(&controller), vec!["Fruit/0003", "Fruit/0002"]);
    }

    #[test]
    fn select_kind_resets_everything() {
        let fixture = StoreFixture::new()
            .with_entities("Fruit", 5)
            .with_entities("Basket", 1);
        let mut controller = PageController::new(2);
        controller.select_kind("Fruit");
        controller.toggle_sort("rank").unwrap();
        controller.goto_page(&fixture.store, 2).unwrap();

        controller.select_kind("Basket");
        let state = controller.state();
        assert_eq!(state.kind.as_deref(), Some("Basket"));
        assert!(state.sort_key.is_empty());
        assert_eq!(state.direction, SortDirection::Unset);
        assert_eq!(state.current_page, 0);
        assert!(state.buffer.is_empty());
    }

    #[test]
    fn operations_require_a_kind() {
        let store = ScriptedStore::new(vec![]);
        let mut controller = PageController::new(2);
        assert!(matches!(
            controller.fetch_next_page(&store),
            Err(BrowseError::NoKindSelected)
        ));
        assert!(matches!(
            controller.request_next_page(&store),
            Err(BrowseError::NoKindSelected)
        ));
        assert!(matches!(
            controller.toggle_sort("x"),
            Err(BrowseError::NoKindSelected)
        ));
        assert!(matches!(controller.page_view(), Err(BrowseError::NoKindSelected)));
        assert_eq!(store.calls.get(), 0);
    }

    #[test]
    fn prev_on_first_page_is_rejected() {
        let fixture = StoreFixture::new().with_entities("Fruit", 3);
        let mut controller = PageController::new(2);
        controller.select_kind("Fruit");
        assert!(matches!(
            controller.request_prev_page(),
            Err(BrowseError::InvalidPageState(_))
        ));
        controller.request_next_page(&fixture.store).unwrap();
        assert!(matches!(
            controller.request_prev_page(),
            Err(BrowseError::InvalidPageState(_))
        ));
        assert_eq!(controller.current_page(), 1);
    }

    #[test]
    fn store_failure_leaves_state_intact() {
        let fixture = StoreFixture::new().with_entities("Fruit", 5);
        let mut controller = PageController::new(2);
        controller.select_kind("Fruit");
        controller.request_next_page(&fixture.store).unwrap();
        let before = controller.state().clone();

        fixture.store.fail_next_queries(1);
        let err = controller.request_next_page(&fixture.store).unwrap_err();
        assert!(matches!(err, BrowseError::StoreQueryFailed(_)));
        assert_eq!(controller.state(), &before);

        controller.request_next_page(&fixture.store).unwrap();
        assert_eq!(controller.current_page(), 2);
    }

    #[test]
    fn bad_row_fails_whole_batch_without_mutation() {
        let fixture = StoreFixture::new()
            .with_entity("Odd", "1", vec![("ok", json!({"stringValue": "fine"}))])
            .with_entity("Odd", "2", vec![("bad", json!({"mysteryValue": 1}))]);
        let mut controller = PageController::new(5);
        controller.select_kind("Odd");

        let err = controller.request_next_page(&fixture.store).unwrap_err();
        assert!(matches!(err, BrowseError::UnsupportedType { .. }));
        assert_eq!(controller.current_page(), 0);
        assert!(controller.state().buffer.is_empty());
    }

    #[test]
    fn page_view_renders_rows_against_headers() {
        let fixture = StoreFixture::new()
            .with_entity(
                "Fruit",
                "1",
                vec![
                    ("name", json!({"stringValue": "Apple"})),
                    ("weight", json!({"integerValue": "120"})),
                ],
            )
            .with_entity("Fruit", "2", vec![("name", json!({"stringValue": ""}))]);
        let mut controller = PageController::new(10);
        controller.select_kind("Fruit");
        controller.request_next_page(&fixture.store).unwrap();

        let view = controller.page_view().unwrap();
        assert_eq!(view.headers[0], Header::new("key", "key"));
        assert_eq!(view.headers.len(), 3);
        let weight = view.headers.iter().position(|h| h.name == "weight").unwrap();
        let name = view.headers.iter().position(|h| h.name == "name").unwrap();
        assert_eq!(view.rows[0][0], "Fruit/1");
        assert_eq!(view.rows[0][weight], "120");
        assert_eq!(view.rows[1][name], "\"\"");
        assert_eq!(view.rows[1][weight], "-");
        assert_eq!(view.cell_kinds[1][weight], CellKind::Absent);
        assert_eq!(view.cell_kinds[0][weight], CellKind::Value);
        assert_eq!((view.first_row, view.last_row), (1, 2));
    }

    #[test]
    fn marker_lookalike_strings_are_data() {
        let fixture = StoreFixture::new().with_entity(
            "Fruit",
            "1",
            vec![
                ("label", json!({"stringValue": "NULL"})),
                ("dash", json!({"stringValue": "-"})),
                ("gone", json!({"nullValue": null})),
            ],
        );
        let mut controller = PageController::new(10);
        controller.select_kind("Fruit");
        controller.request_next_page(&fixture.store).unwrap();

        let view = controller.page_view().unwrap();
        let column = |name: &str| view.headers.iter().position(|h| h.name == name).unwrap();
        assert_eq!(view.rows[0][column("label")], "NULL");
        assert_eq!(view.cell_kinds[0][column("label")], CellKind::Value);
        assert_eq!(view.cell_kinds[0][column("dash")], CellKind::Value);
        assert_eq!(view.rows[0][column("gone")], "NULL");
        assert_eq!(view.cell_kinds[0][column("gone")], CellKind::Null);
    }

    #[test]
    fn visible_records_carry_key() {
        let fixture = StoreFixture::new().with_entities("Fruit", 2);
        let mut controller = PageController::new(2);
        controller.select_kind("Fruit");
        controller.request_next_page(&fixture.store).unwrap();
        for record in controller.visible() {
            assert!(matches!(record.value("key"), Some(Value::KeyRef(_))));
        }
    }
}
