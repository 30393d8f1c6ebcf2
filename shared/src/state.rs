//! Cached list contents plus pagination metadata.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{PaginationConfig, PaginationMode};
use crate::error::FetchError;
use crate::loader::{CursorToken, LoadOutcome, PageRequest, PageResult};

/// Lifecycle of one list instance.
///
/// `Loaded` and `Errored` hold until the next operation; any load re-enters
/// `Loading`, and `clear` forces `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

#[derive(Clone, Debug)]
pub struct ListState<T> {
    items: Vec<T>,
    phase: Phase,
    error: Option<FetchError>,
    has_more: bool,
    cursor: Option<CursorToken>,
    offset: usize,
    page_size: usize,
    total_available: Option<usize>,
    mode: PaginationMode,
    generation: u64,
}

impl<T> ListState<T> {
    #[must_use]
    pub fn new(config: &PaginationConfig) -> Self {
        Self {
            items: Vec::new(),
            phase: Phase::Idle,
            error: None,
            has_more: true,
            cursor: None,
            offset: 0,
            page_size: config.clamp_page_size(config.default_page_size),
            total_available: None,
            mode: config.mode,
            generation: 0,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    /// Message of the last failed fetch, if it has not been cleared.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(FetchError::message)
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub fn cursor(&self) -> Option<&CursorToken> {
        self.cursor.as_ref()
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Always equal to `items().len()`.
    #[must_use]
    pub fn total_loaded(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn total_available(&self) -> Option<usize> {
        self.total_available
    }

    #[must_use]
    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && !self.loading()
    }

    #[must_use]
    pub fn can_load_more(&self) -> bool {
        self.has_more && !self.loading()
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        match self.mode {
            PaginationMode::Cursor => self.total_loaded().div_ceil(self.page_size),
            PaginationMode::Offset => self.offset / self.page_size + 1,
        }
    }

    /// Stores an already clamped page size. Returns whether it changed.
    pub(crate) fn set_page_size(&mut self, page_size: usize) -> bool {
        let changed = self.page_size != page_size;
        self.page_size = page_size;
        changed
    }

    pub(crate) fn begin_first_page(&mut self) -> (u64, PageRequest) {
        self.generation += 1;
        self.items.clear();
        self.cursor = None;
        self.offset = 0;
        self.total_available = None;
        self.error = None;
        self.phase = Phase::Loading;
        (self.generation, PageRequest::first(self.page_size))
    }

    /// Checks the `has_more`/`loading` guard and enters `Loading` in one step.
    pub(crate) fn begin_next_page(&mut self) -> Option<(u64, PageRequest)> {
        if !self.has_more || self.loading() {
            return None;
        }
        self.error = None;
        self.phase = Phase::Loading;
        let request = PageRequest {
            page_size: self.page_size,
            cursor: self.cursor.clone(),
            offset: self.items.len(),
        };
        Some((self.generation, request))
    }

    pub(crate) fn finish_first_page(
        &mut self,
        generation: u64,
        result: Result<PageResult<T>, FetchError>,
    ) -> LoadOutcome {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding superseded first page");
            return LoadOutcome::Superseded;
        }

        match result {
            Ok(page) => {
                check_retrieved(&page);
                let received = page.items.len();
                self.items = page.items;
                self.cursor = page.cursor;
                self.has_more = page.has_more;
                self.total_available = page.total_available;
                self.offset = 0;
                self.phase = Phase::Loaded;
                LoadOutcome::Loaded { received }
            }
            Err(e) => {
                self.items.clear();
                self.has_more = false;
                self.error = Some(e.clone());
                self.phase = Phase::Errored;
                LoadOutcome::Failed(e)
            }
        }
    }

    pub(crate) fn finish_next_page(
        &mut self,
        generation: u64,
        request: &PageRequest,
        result: Result<PageResult<T>, FetchError>,
    ) -> LoadOutcome {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding superseded page");
            return LoadOutcome::Superseded;
        }

        match result {
            Ok(page) => {
                check_retrieved(&page);
                let received = page.items.len();
                self.items.extend(page.items);
                self.cursor = page.cursor;
                self.has_more = page.has_more;
                self.total_available = page.total_available.or(self.total_available);
                self.offset = request.offset;
                self.phase = Phase::Loaded;
                LoadOutcome::Loaded { received }
            }
            Err(e) => {
                self.error = Some(e.clone());
                self.phase = Phase::Errored;
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Back to the initial empty state; in-flight loads become stale.
    pub(crate) fn reset(&mut self) {
        self.generation += 1;
        self.items.clear();
        self.cursor = None;
        self.offset = 0;
        self.total_available = None;
        self.has_more = true;
        self.error = None;
        self.phase = Phase::Idle;
    }

    /// Installs restored items as if they had been paged in at the current
    /// page size, so `offset` points at the start of the last page.
    pub(crate) fn seed(
        &mut self,
        items: Vec<T>,
        cursor: Option<CursorToken>,
        has_more: bool,
        total_available: Option<usize>,
    ) {
        self.generation += 1;
        self.items = items;
        self.cursor = cursor;
        self.has_more = has_more;
        self.total_available = total_available;
        self.offset = self.items.len().saturating_sub(1) / self.page_size * self.page_size;
        self.error = None;
        self.phase = Phase::Loaded;
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }

    pub(crate) fn total_available_mut(&mut self) -> &mut Option<usize> {
        &mut self.total_available
    }
}

fn check_retrieved<T>(page: &PageResult<T>) {
    if page.total_retrieved != page.items.len() {
        warn!(
            reported = page.total_retrieved,
            actual = page.items.len(),
            "page source reported a different item count"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Record;

    fn page(ids: &[&str], cursor: Option<&str>, has_more: bool) -> PageResult<Record> {
        PageResult::new(
            ids.iter().map(|id| Record::new().with("id", *id)).collect(),
            cursor.map(CursorToken::from),
            has_more,
        )
    }

    #[test]
    fn starts_idle_and_empty() {
        let state: ListState<Record> = ListState::new(&PaginationConfig::default());
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.is_empty());
        assert!(state.can_load_more());
        assert!(!state.has_error());
        assert_eq!(state.current_page(), 0);
    }

    #[test]
    fn next_page_guard_blocks_while_loading() {
        let mut state: ListState<Record> = ListState::new(&PaginationConfig::default());
        let _ = state.begin_first_page();

        assert!(state.loading());
        assert!(!state.is_empty());
        assert!(state.begin_next_page().is_none());
    }

    #[test]
    fn stale_first_page_is_discarded() {
        let mut state: ListState<Record> = ListState::new(&PaginationConfig::default());
        let (old, _) = state.begin_first_page();
        let (new, _) = state.begin_first_page();

        let outcome = state.finish_first_page(old, Ok(page(&["a"], None, false)));
        assert_eq!(outcome, LoadOutcome::Superseded);
        assert!(state.loading());

        let outcome = state.finish_first_page(new, Ok(page(&["b", "c"], None, false)));
        assert_eq!(outcome, LoadOutcome::Loaded { received: 2 });
        assert_eq!(state.total_loaded(), 2);
    }

    #[test]
    fn current_page_in_both_modes() {
        let cursor_cfg = PaginationConfig::default().with_page_size(4);
        let mut state: ListState<Record> = ListState::new(&cursor_cfg);
        let (generation, _) = state.begin_first_page();
        state.finish_first_page(generation, Ok(page(&["a", "b", "c", "d"], Some("c1"), true)));
        let (generation, request) = state.begin_next_page().unwrap();
        state.finish_next_page(generation, &request, Ok(page(&["e"], None, false)));
        assert_eq!(state.current_page(), 2);

        let offset_cfg = cursor_cfg.with_mode(PaginationMode::Offset);
        let mut state: ListState<Record> = ListState::new(&offset_cfg);
        assert_eq!(state.current_page(), 1);
        let (generation, _) = state.begin_first_page();
        state.finish_first_page(generation, Ok(page(&["a", "b", "c", "d"], Some("c1"), true)));
        let (generation, request) = state.begin_next_page().unwrap();
        assert_eq!(request.offset, 4);
        state.finish_next_page(generation, &request, Ok(page(&["e", "f", "g", "h"], Some("c2"), true)));
        assert_eq!(state.offset(), 4);
        assert_eq!(state.current_page(), 2);
    }

    #[test]
    fn seeded_list_reports_its_last_page() {
        let offset_cfg = PaginationConfig::default()
            .with_page_size(10)
            .with_mode(PaginationMode::Offset);
        let mut state: ListState<Record> = ListState::new(&offset_cfg);
        let ids: Vec<String> = (0..40).map(|i| format!("r{i}")).collect();
        let items = ids.iter().map(|id| Record::new().with("id", id.as_str())).collect();

        state.seed(items, Some(CursorToken::new("c4")), true, None);
        assert_eq!(state.offset(), 30);
        assert_eq!(state.current_page(), 4);

        let (_, request) = state.begin_next_page().unwrap();
        assert_eq!(request.offset, 40);

        state.seed(Vec::new(), None, false, None);
        assert_eq!(state.offset(), 0);
        assert_eq!(state.current_page(), 1);
    }
}
