// lib.rs - shared trip-planning core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

//! Platform-independent core of the trip planner.
//!
//! The heart of the crate is [`Paginator`], a cursor/offset list cache over
//! an injected [`PageSource`]. Around it sit the pieces every list screen
//! needs: optimistic mutations, editable fields with rollback, persisted
//! edit-mode flags, on-disk list snapshots and a per-query list registry.

/// Declares a string-backed identifier newtype.
macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

pub(crate) use typed_id;

pub mod config;
pub mod edit;
pub mod error;
pub mod item;
pub mod kv;
pub mod loader;
pub mod mutation;
pub mod registry;
pub mod snapshot;
pub mod state;
pub mod trip;

pub use config::{ConfigError, PaginationConfig, PaginationMode};
pub use edit::{
    Committed, EditError, EditModeStore, FieldCommitter, FieldId, FieldSet, RejectReason,
    Rejected,
};
pub use error::{FetchError, FetchErrorKind};
pub use item::{IdField, ItemId, ListItem, Record};
pub use kv::{KeyNamespace, KvError, KvKey, KvStore, MemoryKv};
pub use loader::{CursorToken, FnSource, LoadOutcome, PageRequest, PageResult, PageSource, Paginator};
pub use registry::ListRegistry;
pub use snapshot::{ListSnapshot, SnapshotError};
pub use state::{ListState, Phase};
pub use trip::{Activity, ActivityId, ItineraryDay, Trip, TripId, TripPatch, TripQuery, UserId};

#[cfg(all(feature = "sqlite", not(target_arch = "wasm32")))]
pub use kv::SqliteKv;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 50;
pub const DEFAULT_ID_FIELD: &str = "id";
pub const DEFAULT_REGISTRY_CAPACITY: usize = 16;
