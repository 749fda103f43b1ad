//! Sort keys and the object comparator.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::object::{ID_FIELD, MODIFIED_FIELD, Object};
use crate::value::compare_optional;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// A `(field, direction)` sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Desc)
    }

    /// Parses `field` / `-field` notation.
    pub fn parse(notation: &str) -> Self {
        match notation.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(notation.strip_prefix('+').unwrap_or(notation)),
        }
    }
}

/// Completes a sort list so that it yields a stable total order.
///
/// Appends `last_modified` (descending, newest first) and then `id`
/// (ascending) when absent. `last_modified` is unique within a scope but
/// scopes matched by one pattern can share it, so `id` settles those ties
/// the same way [`compare_objects`] does.
pub fn with_tiebreak(sorting: &[Sort]) -> Vec<Sort> {
    let mut sorting = sorting.to_vec();
    if !sorting.iter().any(|sort| sort.field == MODIFIED_FIELD) {
        sorting.push(Sort::desc(MODIFIED_FIELD));
    }
    if !sorting.iter().any(|sort| sort.field == ID_FIELD) {
        sorting.push(Sort::asc(ID_FIELD));
    }
    sorting
}

/// Compares two objects key by key, falling back to the object id.
///
/// Missing fields sort after every value in ascending order, and therefore
/// first in descending order.
pub fn compare_objects(a: &Object, b: &Object, sorting: &[Sort]) -> Ordering {
    for sort in sorting {
        let ordering = compare_optional(a.resolve(&sort.field), b.resolve(&sort.field));
        let ordering = match sort.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering.is_ne() {
            return ordering;
        }
    }
    a.id().cmp(&b.id())
}

/// Sorts objects in place.
pub fn sort_objects(objects: &mut [Object], sorting: &[Sort]) {
    objects.sort_by(|a, b| compare_objects(a, b, sorting));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(json: serde_json::Value) -> Object {
        Object::try_from(json).unwrap()
    }

    fn ids(objects: &[Object]) -> Vec<&str> {
        objects.iter().filter_map(Object::id).collect()
    }

    #[test]
    fn test_parse() {
        assert_eq!(Sort::parse("-title"), Sort::desc("title"));
        assert_eq!(Sort::parse("title"), Sort::asc("title"));
        assert_eq!(Sort::parse("+title"), Sort::asc("title"));
    }

    #[test]
    fn test_with_tiebreak() {
        let sorting = with_tiebreak(&[Sort::asc("title")]);
        assert_eq!(
            sorting,
            vec![Sort::asc("title"), Sort::desc("last_modified"), Sort::asc("id")]
        );

        let sorting = with_tiebreak(&[Sort::asc("last_modified")]);
        assert_eq!(sorting, vec![Sort::asc("last_modified"), Sort::asc("id")]);

        let sorting = with_tiebreak(&[Sort::desc("id")]);
        assert_eq!(sorting, vec![Sort::desc("id"), Sort::desc("last_modified")]);
    }

    #[test]
    fn test_missing_fields_sort_last_ascending() {
        let mut objects = vec![
            object(json!({"id": "a", "status": 2})),
            object(json!({"id": "b"})),
            object(json!({"id": "c", "status": 0})),
            object(json!({"id": "d", "status": null})),
        ];
        sort_objects(&mut objects, &[Sort::asc("status")]);
        assert_eq!(ids(&objects), vec!["c", "a", "d", "b"]);

        sort_objects(&mut objects, &[Sort::desc("status")]);
        assert_eq!(ids(&objects), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_secondary_key_and_id_fallback() {
        let mut objects = vec![
            object(json!({"id": "z", "kind": "x", "rank": 1})),
            object(json!({"id": "y", "kind": "x", "rank": 2})),
            object(json!({"id": "b", "kind": "a"})),
            object(json!({"id": "a", "kind": "a"})),
        ];
        sort_objects(&mut objects, &[Sort::asc("kind"), Sort::desc("rank")]);
        assert_eq!(ids(&objects), vec!["a", "b", "y", "z"]);
    }

    #[test]
    fn test_sort_on_nested_field() {
        let mut objects = vec![
            object(json!({"id": "1", "person": {"age": 40}})),
            object(json!({"id": "2", "person": {"age": 12}})),
        ];
        sort_objects(&mut objects, &[Sort::asc("person.age")]);
        assert_eq!(ids(&objects), vec!["2", "1"]);
    }
}
