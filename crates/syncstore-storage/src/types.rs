//! Query and result types for the storage contract.

use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::object::Object;
use crate::pagination::Cursor;
use crate::sort::{Sort, with_tiebreak};

/// Parameters of a `get_all` / `delete_all` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Conditions every returned object satisfies (ANDed).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    /// Sort keys, primary first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sorting: Vec<Sort>,
    /// Continuation groups; ANDed inside a group, ORed across groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pagination_rules: Vec<Vec<Filter>>,
    /// Maximum number of objects to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Include tombstones in `get_all` results.
    #[serde(default)]
    pub include_deleted: bool,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sorting.push(sort);
        self
    }

    #[must_use]
    pub fn with_pagination_rules(mut self, rules: Vec<Vec<Filter>>) -> Self {
        self.pagination_rules = rules;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn including_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Continues after the position captured by `cursor`.
    #[must_use]
    pub fn after(mut self, cursor: &Cursor) -> Self {
        self.pagination_rules = cursor.rules(&self.effective_sorting());
        self
    }

    /// The sort list actually applied, including the `last_modified` and `id`
    /// tiebreaks.
    pub fn effective_sorting(&self) -> Vec<Sort> {
        with_tiebreak(&self.sorting)
    }
}

/// A page of objects plus the total number of matching live objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub objects: Vec<Object>,
    /// Live objects matching the filters, ignoring pagination and limit.
    pub total: usize,
}

impl QueryResult {
    pub fn new(objects: Vec<Object>, total: usize) -> Self {
        Self { objects, total }
    }

    /// Cursor for the next page, when this page filled the query's limit.
    pub fn next_cursor(&self, query: &Query) -> Option<Cursor> {
        let limit = query.limit?;
        if self.objects.len() < limit {
            return None;
        }
        self.objects
            .last()
            .map(|last| Cursor::from_object(last, &query.effective_sorting()))
    }
}

/// Options of a single-object delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Requested tombstone timestamp, subject to the monotonicity rule.
    pub last_modified: Option<i64>,
    /// Leave a tombstone behind.
    pub with_deleted: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            last_modified: None,
            with_deleted: true,
        }
    }
}

impl DeleteOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_last_modified(mut self, last_modified: i64) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Removes the object without leaving a tombstone.
    #[must_use]
    pub fn without_tombstone(mut self) -> Self {
        self.with_deleted = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Comparison;
    use serde_json::json;

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .with_filter(Filter::new("flavor", "mint", Comparison::Eq))
            .with_sort(Sort::desc("size"))
            .with_limit(10)
            .including_deleted();
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.limit, Some(10));
        assert!(query.include_deleted);
        assert_eq!(
            query.effective_sorting(),
            vec![Sort::desc("size"), Sort::desc("last_modified")]
        );
    }

    #[test]
    fn test_next_cursor_only_for_full_pages() {
        let objects: Vec<Object> = (1..=3)
            .map(|i| Object::try_from(json!({"id": i.to_string(), "last_modified": i})).unwrap())
            .collect();
        let result = QueryResult::new(objects, 10);

        let query = Query::new().with_limit(3);
        let cursor = result.next_cursor(&query).unwrap();
        assert_eq!(cursor.position().last_modified(), Some(3));

        assert!(result.next_cursor(&Query::new().with_limit(4)).is_none());
        assert!(result.next_cursor(&Query::new()).is_none());
    }

    #[test]
    fn test_query_after_cursor_installs_rules() {
        let last = Object::try_from(json!({"id": "a", "last_modified": 7})).unwrap();
        let query = Query::new().with_sort(Sort::asc("title"));
        let cursor = Cursor::from_object(&last, &query.effective_sorting());
        let query = query.after(&cursor);
        assert_eq!(query.pagination_rules.len(), 3);
    }

    #[test]
    fn test_delete_options_default_keeps_tombstone() {
        assert!(DeleteOptions::default().with_deleted);
        assert!(!DeleteOptions::new().without_tombstone().with_deleted);
    }
}
