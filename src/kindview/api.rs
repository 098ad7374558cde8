//! # API Facade
//!
//! A thin facade that every UI goes through. It owns the store and one
//! [`PageController`] session, and turns each user intent into controller calls
//! plus a fresh [`PageView`].
//!
//! Unlike the raw controller, intents that restart a query (`select_kind`,
//! `toggle_sort`) also fetch the first page, since a UI always wants something
//! to show afterwards.
//!
//! The facade does no I/O of its own and returns data, not strings.
//!
//! `BrowserApi<S: DataStore>` is generic over the storage backend:
//! - Production: `BrowserApi<Box<dyn DataStore>>` (emulator or dump file)
//! - Testing: `BrowserApi<InMemoryStore>`

use crate::controller::{PageController, PageView};
use crate::display::{to_display_record, DisplayRecord};
use crate::error::Result;
use crate::model::SortDirection;
use crate::store::DataStore;

pub struct BrowserApi<S: DataStore> {
    store: S,
    session: PageController,
}

impl<S: DataStore> BrowserApi<S> {
    pub fn new(store: S, page_size: usize) -> Self {
        Self {
            store,
            session: PageController::new(page_size),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> &PageController {
        &self.session
    }

    pub fn list_kinds(&self) -> Result<Vec<String>> {
        self.store.list_kinds()
    }

    /// Opens `kind` on its first page.
    pub fn select_kind(&mut self, kind: &str) -> Result<PageView> {
        self.session.select_kind(kind);
        self.session.request_next_page(&self.store)?;
        self.session.page_view()
    }

    /// Cycles the sort on `property` and shows the first page of the new order.
    pub fn toggle_sort(&mut self, property: &str) -> Result<PageView> {
        self.session.toggle_sort(property)?;
        self.session.request_next_page(&self.store)?;
        self.session.page_view()
    }

    /// Opens `kind` already sorted and positioned on `page`.
    ///
    /// The sort is applied before anything is fetched, so only the pages up to
    /// `page` are queried.
    pub fn open(
        &mut self,
        kind: &str,
        sort: Option<(&str, SortDirection)>,
        page: usize,
    ) -> Result<PageView> {
        self.session.select_kind(kind);
        if let Some((property, direction)) = sort {
            while self.session.state().direction != direction {
                self.session.toggle_sort(property)?;
            }
        }
        self.session.goto_page(&self.store, page)?;
        self.session.page_view()
    }

    pub fn next_page(&mut self) -> Result<PageView> {
        self.session.request_next_page(&self.store)?;
        self.session.page_view()
    }

    pub fn prev_page(&mut self) -> Result<PageView> {
        self.session.request_prev_page()?;
        self.session.page_view()
    }

    pub fn goto_page(&mut self, page: usize) -> Result<PageView> {
        self.session.goto_page(&self.store, page)?;
        self.session.page_view()
    }

    pub fn view(&self) -> Result<PageView> {
        self.session.page_view()
    }

    /// The current page's entities with every property stringified.
    pub fn display_records(&self) -> Vec<DisplayRecord> {
        self.session
            .visible()
            .iter()
            .map(to_display_record)
            .collect()
    }
}
