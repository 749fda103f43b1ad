//! Stored objects and dotted-path field access.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::value::Value;

/// Name of the identifier field.
pub const ID_FIELD: &str = "id";
/// Name of the modification timestamp field.
pub const MODIFIED_FIELD: &str = "last_modified";
/// Name of the tombstone marker field.
pub const DELETED_FIELD: &str = "deleted";

/// A stored document: an ordered mapping of field name to [`Value`].
///
/// Once stored, an object always carries [`ID_FIELD`] and [`MODIFIED_FIELD`].
/// Backends write copies; the caller's object is never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Object(BTreeMap<String, Value>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// The object id, when present and a string.
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    /// The modification timestamp, when present and an integer.
    pub fn last_modified(&self) -> Option<i64> {
        self.0.get(MODIFIED_FIELD).and_then(Value::as_i64)
    }

    pub fn set_last_modified(&mut self, timestamp: i64) {
        self.0
            .insert(MODIFIED_FIELD.to_string(), Value::from(timestamp));
    }

    /// Whether this object is a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.0
            .get(DELETED_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Top-level field lookup.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Resolves a dotted field path such as `person.age`.
    ///
    /// A key that literally contains the dots wins. Otherwise the longest
    /// existing key that prefixes the path is descended into, so a field
    /// named `a.b` holding `{"c": 1}` answers `a.b.c`.
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        resolve_in(&self.0, path)
    }

    /// Rejects objects holding raw binary values anywhere.
    pub fn ensure_storable(&self) -> Result<(), StorageError> {
        match self
            .0
            .iter()
            .find_map(|(field, value)| value.find_bytes(field))
        {
            Some(path) => Err(StorageError::unsupported_value(path)),
            None => Ok(()),
        }
    }
}

fn resolve_in<'a>(map: &'a BTreeMap<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = map.get(path) {
        return Some(value);
    }

    let mut end = path.len();
    while let Some(dot) = path[..end].rfind('.') {
        if let Some(value) = map.get(&path[..dot]) {
            return match value {
                Value::Object(inner) => resolve_in(inner, &path[dot + 1..]),
                _ => None,
            };
        }
        end = dot;
    }
    None
}

impl From<BTreeMap<String, Value>> for Object {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object.0)
    }
}

impl TryFrom<serde_json::Value> for Object {
    type Error = StorageError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match Value::from(json) {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StorageError::invalid_object(format!(
                "expected a JSON object, got {}",
                other.type_name()
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(json: serde_json::Value) -> Object {
        Object::try_from(json).unwrap()
    }

    #[test]
    fn test_accessors() {
        let obj = object(json!({"id": "abc", "last_modified": 42, "deleted": true}));
        assert_eq!(obj.id(), Some("abc"));
        assert_eq!(obj.last_modified(), Some(42));
        assert!(obj.is_deleted());

        let obj = object(json!({"id": 12}));
        assert_eq!(obj.id(), None);
        assert!(!obj.is_deleted());
    }

    #[test]
    fn test_resolve_nested_paths() {
        let obj = object(json!({
            "person": {"age": 30, "name": {"first": "Ada"}},
            "a.b": {"c": 1},
            "x.y": "literal",
            "x": {"y": "nested"},
        }));
        assert_eq!(obj.resolve("person.age"), Some(&Value::from(30)));
        assert_eq!(obj.resolve("person.name.first"), Some(&Value::from("Ada")));
        assert_eq!(obj.resolve("a.b.c"), Some(&Value::from(1)));
        assert_eq!(obj.resolve("x.y"), Some(&Value::from("literal")));
        assert_eq!(obj.resolve("person.height"), None);
        assert_eq!(obj.resolve("person.age.years"), None);
        assert_eq!(obj.resolve("unknown.path"), None);
    }

    #[test]
    fn test_rejects_non_object_json() {
        let err = Object::try_from(json!([1, 2])).unwrap_err();
        assert!(matches!(err, StorageError::InvalidObject { .. }));
    }

    #[test]
    fn test_ensure_storable_reports_binary_path() {
        let mut obj = object(json!({"meal": {"kind": "steak"}}));
        assert!(obj.ensure_storable().is_ok());

        obj.insert(
            "meal",
            Value::Object([("raw".to_string(), Value::Bytes(vec![0xde, 0xad]))].into()),
        );
        let err = obj.ensure_storable().unwrap_err();
        assert!(err.is_unsupported_value());
        assert!(err.to_string().contains("meal.raw"));
    }

    #[test]
    fn test_from_iterator() {
        let obj: Object = [("flavor", Value::from("mint")), ("size", Value::from(3))]
            .into_iter()
            .collect();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj.get("flavor"), Some(&Value::from("mint")));
    }
}
