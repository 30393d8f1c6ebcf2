#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use trip_shared::{
    CursorToken, EditError, FetchError, FetchErrorKind, FieldCommitter, FieldId, PageRequest,
    PageResult, PageSource, Record, Trip, TripId, TripQuery, UserId,
};

/// In-memory stand-in for the remote trip collection. Cursors are the id of
/// the last trip on the previous page.
#[derive(Default)]
pub struct TripStore {
    trips: Mutex<Vec<Trip>>,
    fail_next: Mutex<Option<FetchError>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl TripStore {
    pub fn with_trips(owner: &str, count: usize) -> Self {
        let store = Self::default();
        {
            let mut trips = store.trips.lock().unwrap();
            for i in 0..count {
                let mut trip = Trip::draft(UserId::new(owner), format!("Trip {i}"), i as u64);
                trip.id = TripId::new(format!("{owner}-trip-{i}"));
                trips.push(trip);
            }
        }
        store
    }

    pub fn fail_next(&self, error: FetchError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn insert_front(&self, trip: Trip) {
        self.trips.lock().unwrap().insert(0, trip);
    }

    pub fn get(&self, id: &TripId) -> Option<Trip> {
        self.trips.lock().unwrap().iter().find(|t| &t.id == id).cloned()
    }

    pub fn set_title(&self, id: &TripId, title: &str) -> bool {
        let mut trips = self.trips.lock().unwrap();
        match trips.iter_mut().find(|t| &t.id == id) {
            Some(trip) => {
                trip.title = title.to_string();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl PageSource<TripQuery, Trip> for TripStore {
    async fn fetch(&self, query: &TripQuery, request: PageRequest) -> Result<PageResult<Trip>, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(e) = self.fail_next.lock().unwrap().take() {
            return Err(e);
        }

        let trips = self.trips.lock().unwrap();
        let matching: Vec<&Trip> = trips
            .iter()
            .filter(|t| t.owner_id == query.owner_id)
            .filter(|t| match &query.search {
                Some(term) => t.title.to_lowercase().contains(&term.to_lowercase()),
                None => true,
            })
            .collect();

        let start = match &request.cursor {
            None => 0,
            Some(cursor) => {
                matching
                    .iter()
                    .position(|t| t.id.as_str() == cursor.as_str())
                    .ok_or_else(|| FetchError::new(FetchErrorKind::NotFound, "stale cursor"))?
                    + 1
            }
        };
        let end = (start + request.page_size).min(matching.len());
        let page: Vec<Trip> = matching[start..end].iter().map(|t| (*t).clone()).collect();
        let has_more = end < matching.len();
        let cursor = if has_more {
            page.last().map(|t| CursorToken::new(t.id.as_str()))
        } else {
            None
        };

        Ok(PageResult::new(page, cursor, has_more).with_total_available(matching.len()))
    }
}

/// Writes trip titles back to the store; `FieldId` is `<trip id>.title`.
pub struct TitleCommitter<'a> {
    pub store: &'a TripStore,
    pub reject: bool,
}

#[async_trait]
impl FieldCommitter<String> for TitleCommitter<'_> {
    async fn commit(&self, field: &FieldId, value: &String) -> Result<(), EditError> {
        if self.reject {
            return Err(EditError::Remote("write denied".into()));
        }
        let trip_id = field.as_str().trim_end_matches(".title");
        if self.store.set_title(&TripId::new(trip_id), value) {
            Ok(())
        } else {
            Err(EditError::Remote(format!("no trip {trip_id}")))
        }
    }
}

/// Serves a fixed sequence of responses and records every request.
pub struct ScriptedSource {
    pages: Mutex<VecDeque<Result<PageResult<Record>, FetchError>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedSource {
    pub fn new(pages: Vec<Result<PageResult<Record>, FetchError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource<(), Record> for ScriptedSource {
    async fn fetch(&self, _: &(), request: PageRequest) -> Result<PageResult<Record>, FetchError> {
        self.requests.lock().unwrap().push(request);
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(PageResult::empty()))
    }
}

pub fn records(prefix: &str, count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| Record::new().with("id", format!("{prefix}{i}")))
        .collect()
}
