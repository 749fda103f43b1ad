//! Tombstones: the minimal residue of deleted objects.

use std::cmp::Reverse;

use crate::error::StorageError;
use crate::object::{DELETED_FIELD, ID_FIELD, MODIFIED_FIELD, Object};
use crate::value::Value;

/// Builds `{id, last_modified, deleted: true}`.
pub fn tombstone(id: &str, last_modified: i64) -> Object {
    [
        (ID_FIELD, Value::from(id)),
        (MODIFIED_FIELD, Value::from(last_modified)),
        (DELETED_FIELD, Value::Bool(true)),
    ]
    .into_iter()
    .collect()
}

/// Which tombstones a purge erases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeCriteria {
    before: Option<i64>,
    max_retained: Option<usize>,
}

impl PurgeCriteria {
    /// `before` erases tombstones strictly older than the cutoff;
    /// `max_retained` keeps only the newest N per scope. They are exclusive.
    pub fn new(before: Option<i64>, max_retained: Option<usize>) -> Result<Self, StorageError> {
        if before.is_some() && max_retained.is_some() {
            return Err(StorageError::invalid_query(
                "purge_deleted accepts either 'before' or 'max_retained', not both",
            ));
        }
        Ok(Self {
            before,
            max_retained,
        })
    }

    /// Ids of the tombstones of one scope to erase.
    pub fn select<'a>(&self, tombstones: impl IntoIterator<Item = &'a Object>) -> Vec<String> {
        let mut candidates: Vec<(&str, i64)> = tombstones
            .into_iter()
            .filter_map(|t| Some((t.id()?, t.last_modified().unwrap_or(i64::MIN))))
            .collect();

        if let Some(before) = self.before {
            candidates.retain(|(_, last_modified)| *last_modified < before);
        }
        if let Some(max_retained) = self.max_retained {
            candidates.sort_by_key(|(_, last_modified)| Reverse(*last_modified));
            let retained = max_retained.min(candidates.len());
            candidates = candidates.split_off(retained);
        }
        candidates.into_iter().map(|(id, _)| id.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut ids: Vec<String>) -> Vec<String> {
        ids.sort();
        ids
    }

    #[test]
    fn test_tombstone_has_only_basic_fields() {
        let t = tombstone("abc", 42);
        assert_eq!(t.len(), 3);
        assert_eq!(t.id(), Some("abc"));
        assert_eq!(t.last_modified(), Some(42));
        assert!(t.is_deleted());
    }

    #[test]
    fn test_select_all() {
        let tombstones = [tombstone("a", 1), tombstone("b", 2)];
        let criteria = PurgeCriteria::default();
        assert_eq!(sorted(criteria.select(&tombstones)), vec!["a", "b"]);
    }

    #[test]
    fn test_before_is_exclusive() {
        let tombstones = [tombstone("a", 10), tombstone("b", 20), tombstone("c", 30)];
        let criteria = PurgeCriteria::new(Some(20), None).unwrap();
        assert_eq!(criteria.select(&tombstones), vec!["a"]);
    }

    #[test]
    fn test_max_retained_keeps_newest() {
        let tombstones = [tombstone("a", 10), tombstone("c", 30), tombstone("b", 20)];
        let criteria = PurgeCriteria::new(None, Some(2)).unwrap();
        assert_eq!(criteria.select(&tombstones), vec!["a"]);

        let criteria = PurgeCriteria::new(None, Some(5)).unwrap();
        assert!(criteria.select(&tombstones).is_empty());
    }

    #[test]
    fn test_before_and_max_retained_are_exclusive() {
        let err = PurgeCriteria::new(Some(1), Some(1)).unwrap_err();
        assert!(matches!(err, StorageError::InvalidQuery { .. }));
    }
}
