//! Inline editing: optimistic field values with rollback, and persisted
//! per-screen edit-mode flags.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::kv::{get_json, set_json, KeyNamespace, KvError, KvKey, KvStore};

crate::typed_id!(
    /// Names one editable field, e.g. `trip.title`.
    FieldId
);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("remote rejected the change: {0}")]
    Remote(String),

    #[error("edit state storage failed: {0}")]
    Kv(#[from] KvError),
}

/// Why an edit did not stick.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RejectReason {
    #[error("unknown field")]
    UnknownField,

    #[error("a previous edit is still being saved")]
    Busy,

    #[error("invalid value: {0}")]
    Invalid(String),

    #[error("commit failed: {0}")]
    CommitFailed(EditError),

    /// The field was reloaded while the commit was in flight.
    #[error("field was reloaded before the commit finished")]
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Committed<V> {
    pub field: FieldId,
    pub value: V,
    /// `false` when the new value equalled the committed one and no commit ran.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejected<V> {
    pub field: FieldId,
    pub reason: RejectReason,
    /// The value now shown for the field, after any rollback.
    pub current: Option<V>,
}

/// Writes one field to the remote store.
#[async_trait]
pub trait FieldCommitter<V: Sync>: Send + Sync {
    async fn commit(&self, field: &FieldId, value: &V) -> Result<(), EditError>;
}

type Validator<V> = Box<dyn Fn(&V) -> Result<(), String> + Send + Sync>;

struct FieldEntry<V> {
    committed: V,
    displayed: V,
    editing: bool,
    in_flight: bool,
    /// Bumped by every `insert`; a commit started under an older revision
    /// does not overwrite the reloaded value.
    revision: u64,
}

struct FieldTable<V> {
    entries: HashMap<FieldId, FieldEntry<V>>,
    validators: HashMap<FieldId, Validator<V>>,
}

/// A group of inline-editable fields sharing one commit path.
///
/// The displayed value switches to the new value as soon as an edit starts
/// and falls back to the last committed value if the commit fails or the
/// edit future is dropped before the commit resolves.
pub struct FieldSet<V> {
    fields: RwLock<FieldTable<V>>,
}

impl<V> Default for FieldSet<V> {
    fn default() -> Self {
        Self {
            fields: RwLock::new(FieldTable {
                entries: HashMap::new(),
                validators: HashMap::new(),
            }),
        }
    }
}

impl<V> FieldSet<V> {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, FieldTable<V>> {
        self.fields.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, FieldTable<V>> {
        self.fields.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Rolls an in-flight edit back unless `settle` takes it over first.
struct PendingEdit<'a, V: Clone> {
    set: &'a FieldSet<V>,
    field: &'a FieldId,
    revision: u64,
    armed: bool,
}

impl<V: Clone> PendingEdit<'_, V> {
    fn disarm(mut self) -> u64 {
        self.armed = false;
        self.revision
    }
}

impl<V: Clone> Drop for PendingEdit<'_, V> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut fields = self.set.write();
        if let Some(entry) = fields.entries.get_mut(self.field) {
            entry.in_flight = false;
            if entry.revision == self.revision {
                entry.displayed = entry.committed.clone();
            }
            warn!(field = %self.field, "edit dropped before commit resolved, rolled back");
        }
    }
}

impl<V> FieldSet<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(self, id: impl Into<FieldId>, initial: V) -> Self {
        self.insert(id, initial);
        self
    }

    /// Validators are keyed by id, so they may be registered before or
    /// after the field itself.
    #[must_use]
    pub fn with_validator(
        self,
        id: impl Into<FieldId>,
        validator: impl Fn(&V) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.write().validators.insert(id.into(), Box::new(validator));
        self
    }

    /// Adds or resets a field to a committed value, e.g. after a reload.
    /// A commit still in flight for the field no longer overwrites it.
    pub fn insert(&self, id: impl Into<FieldId>, value: V) {
        let mut fields = self.write();
        let id = id.into();
        match fields.entries.get_mut(&id) {
            Some(entry) => {
                entry.committed = value.clone();
                entry.displayed = value;
                entry.revision += 1;
            }
            None => {
                fields.entries.insert(
                    id,
                    FieldEntry {
                        committed: value.clone(),
                        displayed: value,
                        editing: false,
                        in_flight: false,
                        revision: 0,
                    },
                );
            }
        }
    }

    /// What the UI should render right now.
    #[must_use]
    pub fn value(&self, id: &FieldId) -> Option<V> {
        self.read().entries.get(id).map(|e| e.displayed.clone())
    }

    #[must_use]
    pub fn committed(&self, id: &FieldId) -> Option<V> {
        self.read().entries.get(id).map(|e| e.committed.clone())
    }

    #[must_use]
    pub fn is_editing(&self, id: &FieldId) -> bool {
        self.read().entries.get(id).is_some_and(|e| e.editing)
    }

    #[must_use]
    pub fn is_saving(&self, id: &FieldId) -> bool {
        self.read().entries.get(id).is_some_and(|e| e.in_flight)
    }

    /// Switches a field between its display and edit representation.
    /// Returns `false` for unknown fields.
    pub fn set_editing(&self, id: &FieldId, editing: bool) -> bool {
        match self.write().entries.get_mut(id) {
            Some(entry) => {
                entry.editing = editing;
                true
            }
            None => false,
        }
    }

    /// Shows `new_value` immediately, commits it, and rolls back on failure.
    /// Dropping the returned future mid-commit also rolls back.
    #[instrument(skip(self, field, new_value, committer), fields(field = %field))]
    pub async fn attempt_edit<C>(
        &self,
        field: &FieldId,
        new_value: V,
        committer: &C,
    ) -> Result<Committed<V>, Rejected<V>>
    where
        C: FieldCommitter<V> + ?Sized,
    {
        let Some(revision) = self.begin(field, &new_value)? else {
            return Ok(Committed {
                field: field.clone(),
                value: new_value,
                changed: false,
            });
        };
        let pending = PendingEdit {
            set: self,
            field,
            revision,
            armed: true,
        };

        let result = committer.commit(field, &new_value).await;
        self.settle(field, pending.disarm(), new_value, result)
    }

    /// Marks the edit in flight and returns the field revision it started
    /// under. `Ok(None)` means nothing to commit.
    fn begin(&self, field: &FieldId, new_value: &V) -> Result<Option<u64>, Rejected<V>> {
        let mut fields = self.write();
        let FieldTable { entries, validators } = &mut *fields;
        let Some(entry) = entries.get_mut(field) else {
            return Err(Rejected {
                field: field.clone(),
                reason: RejectReason::UnknownField,
                current: None,
            });
        };

        let reject = |reason, entry: &FieldEntry<V>| Rejected {
            field: field.clone(),
            reason,
            current: Some(entry.displayed.clone()),
        };

        if entry.in_flight {
            return Err(reject(RejectReason::Busy, &*entry));
        }
        if let Some(validate) = validators.get(field) {
            if let Err(reason) = validate(new_value) {
                debug!(%reason, "edit failed validation");
                return Err(reject(RejectReason::Invalid(reason), &*entry));
            }
        }
        if *new_value == entry.committed {
            entry.editing = false;
            return Ok(None);
        }

        entry.displayed = new_value.clone();
        entry.in_flight = true;
        Ok(Some(entry.revision))
    }

    fn settle(
        &self,
        field: &FieldId,
        revision: u64,
        new_value: V,
        result: Result<(), EditError>,
    ) -> Result<Committed<V>, Rejected<V>> {
        let mut fields = self.write();
        let Some(entry) = fields.entries.get_mut(field) else {
            return Err(Rejected {
                field: field.clone(),
                reason: RejectReason::UnknownField,
                current: None,
            });
        };
        entry.in_flight = false;

        if entry.revision != revision {
            debug!(revision, current = entry.revision, "field reloaded during commit, keeping reload");
            return Err(Rejected {
                field: field.clone(),
                reason: RejectReason::Superseded,
                current: Some(entry.displayed.clone()),
            });
        }

        match result {
            Ok(()) => {
                entry.committed = new_value.clone();
                entry.displayed = new_value.clone();
                entry.editing = false;
                info!("field committed");
                Ok(Committed {
                    field: field.clone(),
                    value: new_value,
                    changed: true,
                })
            }
            Err(e) => {
                warn!(error = %e, "commit failed, rolling back");
                entry.displayed = entry.committed.clone();
                Err(Rejected {
                    field: field.clone(),
                    reason: RejectReason::CommitFailed(e),
                    current: Some(entry.committed.clone()),
                })
            }
        }
    }
}

/// Per-screen edit-mode flags kept in an injected [`KvStore`].
pub struct EditModeStore<S: KvStore + ?Sized> {
    store: Arc<S>,
}

impl<S: KvStore + ?Sized> Clone for EditModeStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KvStore + ?Sized> EditModeStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn key(screen: &str) -> Result<KvKey, EditError> {
        Ok(KvKey::new(KeyNamespace::EditMode, screen)?)
    }

    /// Unknown screens start out of edit mode.
    pub async fn is_editing(&self, screen: &str) -> Result<bool, EditError> {
        let key = Self::key(screen)?;
        Ok(get_json::<bool, S>(&*self.store, &key).await?.unwrap_or(false))
    }

    pub async fn set_editing(&self, screen: &str, editing: bool) -> Result<(), EditError> {
        let key = Self::key(screen)?;
        set_json(&*self.store, &key, &editing).await?;
        debug!(screen, editing, "edit mode saved");
        Ok(())
    }

    /// Flips and persists the flag, returning the new value.
    pub async fn toggle(&self, screen: &str) -> Result<bool, EditError> {
        let editing = !self.is_editing(screen).await?;
        self.set_editing(screen, editing).await?;
        Ok(editing)
    }
}
