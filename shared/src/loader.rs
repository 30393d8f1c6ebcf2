//! Page loading over an injected source.
//!
//! Loader operations never fail: a rejected fetch is recorded on the list
//! (`has_error`/`error`) and reported through [`LoadOutcome`], so callers
//! poll state instead of handling errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, instrument, warn};

use crate::config::PaginationConfig;
use crate::error::FetchError;
use crate::item::{IdField, ItemId, ListItem};
use crate::state::{ListState, Phase};

crate::typed_id!(
    /// Continuation marker handed out by a [`PageSource`]. Opaque to the cache.
    CursorToken
);

/// What the cache asks a source for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_size: usize,
    /// `None` requests the first page.
    pub cursor: Option<CursorToken>,
    /// Number of items already loaded, for offset-based sources.
    pub offset: usize,
}

impl PageRequest {
    #[must_use]
    pub fn first(page_size: usize) -> Self {
        Self {
            page_size,
            cursor: None,
            offset: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub cursor: Option<CursorToken>,
    pub has_more: bool,
    pub total_retrieved: usize,
    pub total_available: Option<usize>,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, cursor: Option<CursorToken>, has_more: bool) -> Self {
        Self {
            total_retrieved: items.len(),
            items,
            cursor,
            has_more,
            total_available: None,
        }
    }

    /// The final, empty page.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), None, false)
    }

    #[must_use]
    pub fn with_total_available(mut self, total: usize) -> Self {
        self.total_available = Some(total);
        self
    }
}

/// The remote collaborator: returns one page for the caller's arguments.
///
/// `args` is whatever identifies the query (owner id, search term, ...); the
/// cache forwards it untouched.
#[async_trait]
pub trait PageSource<A: ?Sized + Sync + 'static, T: Send + 'static>: Send + Sync {
    async fn fetch(&self, args: &A, request: PageRequest) -> Result<PageResult<T>, FetchError>;
}

/// Adapts a closure returning a future into a [`PageSource`].
pub struct FnSource<F>(pub F);

#[async_trait]
impl<A, T, F, Fut> PageSource<A, T> for FnSource<F>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    F: Fn(A, PageRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PageResult<T>, FetchError>> + Send + 'static,
{
    async fn fetch(&self, args: &A, request: PageRequest) -> Result<PageResult<T>, FetchError> {
        (self.0)(args.clone(), request).await
    }
}

/// How a load operation resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { received: usize },
    /// The error is also stored on the list.
    Failed(FetchError),
    /// Guard tripped: nothing more to load, or a load is already running.
    Skipped,
    /// A newer first-page load or `clear` started while this fetch was in
    /// flight; its result was dropped.
    Superseded,
}

impl LoadOutcome {
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// A single paginated list: cached state plus the operations on it.
///
/// All methods take `&self`. The state lock is never held across an
/// `.await`, so mutations stay available while a fetch is in flight.
pub struct Paginator<T> {
    config: PaginationConfig,
    state: RwLock<ListState<T>>,
}

impl<T: ListItem> Default for Paginator<T> {
    fn default() -> Self {
        Self::new(PaginationConfig::default())
    }
}

impl<T: ListItem> Paginator<T> {
    #[must_use]
    pub fn new(config: PaginationConfig) -> Self {
        let state = ListState::new(&config);
        Self {
            config,
            state: RwLock::new(state),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    #[must_use]
    pub fn id_field(&self) -> &IdField {
        &self.config.id_field
    }

    fn read(&self) -> RwLockReadGuard<'_, ListState<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ListState<T>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&ListState<T>) -> R) -> R {
        f(&self.read())
    }

    #[must_use]
    pub fn snapshot(&self) -> ListState<T> {
        self.read().clone()
    }

    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.read().items().to_vec()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.read().phase()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.read().loading()
    }

    #[must_use]
    pub fn error(&self) -> Option<FetchError> {
        self.read().error().cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    #[must_use]
    pub fn can_load_more(&self) -> bool {
        self.read().can_load_more()
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.read().has_error()
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.read().current_page()
    }

    #[must_use]
    pub fn total_loaded(&self) -> usize {
        self.read().total_loaded()
    }

    #[must_use]
    pub fn find(&self, id: &ItemId) -> Option<T> {
        let field = self.id_field();
        self.read()
            .items()
            .iter()
            .find(|item| item.matches(field, id))
            .cloned()
    }

    /// Drops cached items and loads page one.
    #[instrument(skip(self, source, args))]
    pub async fn load_first_page<S, A>(&self, source: &S, args: &A) -> LoadOutcome
    where
        S: PageSource<A, T> + ?Sized,
        A: ?Sized + Sync + 'static,
    {
        let (generation, request) = self.write().begin_first_page();
        debug!(generation, page_size = request.page_size, "loading first page");

        let result = source.fetch(args, request).await;
        let outcome = self.write().finish_first_page(generation, result);
        log_outcome("first", &outcome);
        outcome
    }

    /// Appends the page after the stored cursor. Skipped while a load is in
    /// flight or once the source reported the end.
    #[instrument(skip(self, source, args))]
    pub async fn load_next_page<S, A>(&self, source: &S, args: &A) -> LoadOutcome
    where
        S: PageSource<A, T> + ?Sized,
        A: ?Sized + Sync + 'static,
    {
        let next = self.write().begin_next_page();
        let Some((generation, request)) = next else {
            debug!("next page skipped");
            return LoadOutcome::Skipped;
        };
        debug!(generation, offset = request.offset, "loading next page");

        let result = source.fetch(args, request.clone()).await;
        let outcome = self.write().finish_next_page(generation, &request, result);
        log_outcome("next", &outcome);
        outcome
    }

    pub async fn refresh<S, A>(&self, source: &S, args: &A) -> LoadOutcome
    where
        S: PageSource<A, T> + ?Sized,
        A: ?Sized + Sync + 'static,
    {
        self.load_first_page(source, args).await
    }

    /// Clamps and stores a page size without fetching. Returns the stored size.
    pub fn set_page_size(&self, requested: usize) -> usize {
        let clamped = self.config.clamp_page_size(requested);
        self.write().set_page_size(clamped);
        clamped
    }

    /// Clamps the page size and reloads from page one. An unchanged size on
    /// an already loaded list does not refetch.
    pub async fn update_page_size<S, A>(&self, requested: usize, source: &S, args: &A) -> LoadOutcome
    where
        S: PageSource<A, T> + ?Sized,
        A: ?Sized + Sync + 'static,
    {
        let clamped = self.config.clamp_page_size(requested);
        let (changed, loaded) = {
            let mut state = self.write();
            let changed = state.set_page_size(clamped);
            (changed, state.phase() == Phase::Loaded)
        };

        if !changed && loaded {
            debug!(page_size = clamped, "page size unchanged, keeping loaded pages");
            return LoadOutcome::Skipped;
        }
        self.load_first_page(source, args).await
    }
}

fn log_outcome(which: &str, outcome: &LoadOutcome) {
    match outcome {
        LoadOutcome::Loaded { received } => info!(page = which, received, "page loaded"),
        LoadOutcome::Failed(e) => warn!(page = which, code = e.code(), error = %e, "page load failed"),
        LoadOutcome::Skipped | LoadOutcome::Superseded => {
            debug!(page = which, ?outcome, "page load had no effect");
        }
    }
}
