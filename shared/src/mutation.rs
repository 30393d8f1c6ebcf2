//! Local optimistic mutations. Synchronous, no network.

use tracing::debug;

use crate::item::{IdField, ItemId, ListItem};
use crate::loader::Paginator;
use crate::state::ListState;

impl<T: ListItem> ListState<T> {
    /// Inserts at the top of the list.
    pub fn prepend_item(&mut self, item: T) {
        self.items_mut().insert(0, item);
        if let Some(total) = self.total_available_mut() {
            *total += 1;
        }
    }

    /// Shallow-merges `patch` into the first item whose `field` equals `id`.
    /// Returns `false` when no item matched.
    pub fn update_item_by(&mut self, field: &IdField, id: &ItemId, patch: T::Patch) -> bool {
        match self.items_mut().iter_mut().find(|item| item.matches(field, id)) {
            Some(item) => {
                item.merge(patch);
                true
            }
            None => {
                debug!(%field, %id, "update for unknown item ignored");
                false
            }
        }
    }

    /// Removes the first item whose `field` equals `id`.
    pub fn remove_item_by(&mut self, field: &IdField, id: &ItemId) -> Option<T> {
        let index = self.items().iter().position(|item| item.matches(field, id))?;
        let removed = self.items_mut().remove(index);
        if let Some(total) = self.total_available_mut() {
            *total = total.saturating_sub(1);
        }
        Some(removed)
    }

    /// Empties the list and returns it to `Idle`.
    pub fn clear(&mut self) {
        self.reset();
    }
}

impl<T: ListItem> Paginator<T> {
    pub fn prepend_item(&self, item: T) {
        self.write().prepend_item(item);
    }

    /// Updates by the configured id field.
    pub fn update_item(&self, id: &ItemId, patch: T::Patch) -> bool {
        self.update_item_by(&self.config().id_field, id, patch)
    }

    pub fn update_item_by(&self, field: &IdField, id: &ItemId, patch: T::Patch) -> bool {
        self.write().update_item_by(field, id, patch)
    }

    /// Removes by the configured id field.
    pub fn remove_item(&self, id: &ItemId) -> Option<T> {
        self.remove_item_by(&self.config().id_field, id)
    }

    pub fn remove_item_by(&self, field: &IdField, id: &ItemId) -> Option<T> {
        self.write().remove_item_by(field, id)
    }

    /// Resets the list; any fetch still in flight is discarded when it lands.
    pub fn clear(&self) {
        self.write().clear();
    }
}
