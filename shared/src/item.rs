//! Item identity and patching.
//!
//! The cache treats items as opaque except for two capabilities: reading an
//! identity value out of a named field, and shallow-merging a patch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::DEFAULT_ID_FIELD;

crate::typed_id!(
    /// Identity value of a list item, compared as a string.
    ItemId
);

/// Name of the field that identifies an item. Defaults to `id`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdField(String);

impl IdField {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for IdField {
    fn default() -> Self {
        Self(DEFAULT_ID_FIELD.to_string())
    }
}

impl fmt::Display for IdField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdField {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Anything a [`crate::Paginator`] can hold.
pub trait ListItem: Clone + Send + Sync + 'static {
    /// Partial update applied by `update_item`.
    type Patch: Send;

    /// Value of `field`, or `None` when the item has no such field.
    fn identity(&self, field: &IdField) -> Option<ItemId>;

    /// Shallow-merge `patch` into `self`.
    fn merge(&mut self, patch: Self::Patch);

    fn matches(&self, field: &IdField, id: &ItemId) -> bool {
        self.identity(field).as_ref() == Some(id)
    }
}

/// Schemaless document, as returned by a document store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builds a record from a JSON value; non-objects yield `None`.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl ListItem for Record {
    type Patch = Map<String, Value>;

    fn identity(&self, field: &IdField) -> Option<ItemId> {
        match self.0.get(field.as_str())? {
            Value::String(s) => Some(ItemId(s.clone())),
            Value::Number(n) => Some(ItemId(n.to_string())),
            Value::Bool(b) => Some(ItemId(b.to_string())),
            _ => None,
        }
    }

    fn merge(&mut self, patch: Self::Patch) {
        self.0.extend(patch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_identity_reads_named_field() {
        let record = Record::new().with("id", "t1").with("slug", 42);

        assert_eq!(record.identity(&IdField::default()), Some(ItemId::new("t1")));
        assert_eq!(record.identity(&IdField::new("slug")), Some(ItemId::new("42")));
        assert_eq!(record.identity(&IdField::new("missing")), None);
    }

    #[test]
    fn record_merge_is_shallow() {
        let mut record = Record::from_value(json!({
            "id": "t1",
            "title": "Lisbon",
            "meta": { "a": 1, "b": 2 }
        }))
        .unwrap();

        let patch = json!({ "title": "Porto", "meta": { "a": 3 } });
        record.merge(patch.as_object().cloned().unwrap());

        assert_eq!(record.get("title"), Some(&json!("Porto")));
        assert_eq!(record.get("meta"), Some(&json!({ "a": 3 })));
        assert_eq!(record.get("id"), Some(&json!("t1")));
    }

    #[test]
    fn non_object_is_not_a_record() {
        assert!(Record::from_value(json!([1, 2])).is_none());
    }
}
