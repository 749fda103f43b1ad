//! Cursor pagination over sorted result sets.
//!
//! Continuing a scan after object `last` under sort keys `k1..kn` means
//! keeping objects that are strictly past `last` on `k1`, or equal on `k1`
//! and strictly past on `k2`, and so on. Each alternative is one AND group;
//! the groups are ORed. Because the sort list always ends with
//! `last_modified` and `id`, which together identify an object, the groups
//! select exactly the objects after `last`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::filter::{Comparison, Filter};
use crate::object::Object;
use crate::sort::{Direction, Sort};

/// Builds the OR-of-AND rule groups continuing after `last`.
///
/// Fields absent from `last` are compared against the MISSING sentinel.
pub fn build_pagination_rules(sorting: &[Sort], last: &Object) -> Vec<Vec<Filter>> {
    let value_of = |field: &str| last.resolve(field).cloned();

    (0..sorting.len())
        .rev()
        .map(|i| {
            let mut group: Vec<Filter> = sorting[..i]
                .iter()
                .map(|sort| Filter {
                    field: sort.field.clone(),
                    value: value_of(&sort.field),
                    operator: Comparison::Eq,
                })
                .collect();
            let sort = &sorting[i];
            group.push(Filter {
                field: sort.field.clone(),
                value: value_of(&sort.field),
                operator: match sort.direction {
                    Direction::Asc => Comparison::Gt,
                    Direction::Desc => Comparison::Lt,
                },
            });
            group
        })
        .collect()
}

/// Opaque continuation token: the sort-field values of the last object seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    last_object: Object,
}

impl Cursor {
    /// Captures the values `object` holds for each sort field.
    ///
    /// Fields are stored under their full dotted path, which
    /// [`Object::resolve`] finds as a literal key.
    pub fn from_object(object: &Object, sorting: &[Sort]) -> Self {
        let last_object = sorting
            .iter()
            .filter_map(|sort| {
                object
                    .resolve(&sort.field)
                    .map(|value| (sort.field.clone(), value.clone()))
            })
            .collect();
        Self { last_object }
    }

    /// The captured position.
    pub fn position(&self) -> &Object {
        &self.last_object
    }

    /// Continuation rules for `sorting` starting after this position.
    pub fn rules(&self, sorting: &[Sort]) -> Vec<Vec<Filter>> {
        build_pagination_rules(sorting, &self.last_object)
    }

    /// Encodes the cursor as URL-safe base64 JSON.
    pub fn encode(&self) -> Result<String, StorageError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| StorageError::invalid_query(format!("unencodable cursor: {e}")))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decodes a token produced by [`Cursor::encode`].
    pub fn decode(token: &str) -> Result<Self, StorageError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| StorageError::invalid_query(format!("malformed cursor: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::invalid_query(format!("malformed cursor: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PaginationMatcher;
    use crate::sort::{sort_objects, with_tiebreak};
    use serde_json::json;

    fn object(json: serde_json::Value) -> Object {
        Object::try_from(json).unwrap()
    }

    #[test]
    fn test_rules_shape() {
        let last = object(json!({"id": "x", "title": "b", "last_modified": 5}));
        let rules = build_pagination_rules(&with_tiebreak(&[Sort::asc("title")]), &last);

        assert_eq!(
            rules,
            vec![
                vec![
                    Filter::new("title", "b", Comparison::Eq),
                    Filter::new("last_modified", 5, Comparison::Eq),
                    Filter::new("id", "x", Comparison::Gt),
                ],
                vec![
                    Filter::new("title", "b", Comparison::Eq),
                    Filter::new("last_modified", 5, Comparison::Lt),
                ],
                vec![Filter::new("title", "b", Comparison::Gt)],
            ]
        );
    }

    #[test]
    fn test_missing_value_becomes_sentinel() {
        let last = object(json!({"last_modified": 5}));
        let rules = build_pagination_rules(&[Sort::asc("title")], &last);
        assert_eq!(rules, vec![vec![Filter::missing("title", Comparison::Gt)]]);
    }

    #[test]
    fn test_pages_cover_everything_exactly_once() {
        let mut objects: Vec<Object> = (0..17)
            .map(|i| {
                // Stamps repeat, as they do across scopes.
                let stamp = 100 + i / 3;
                let mut obj = object(json!({"id": format!("id-{i:02}"), "last_modified": stamp}));
                match i % 4 {
                    0 => {}
                    1 => {
                        obj.insert("status", "open");
                    }
                    2 => {
                        obj.insert("status", i);
                    }
                    _ => {
                        obj.insert("status", serde_json::Value::Null);
                    }
                }
                obj
            })
            .collect();

        for sorting in [
            vec![Sort::asc("status")],
            vec![Sort::desc("status")],
            vec![Sort::desc("status"), Sort::asc("last_modified")],
        ] {
            let sorting = with_tiebreak(&sorting);
            sort_objects(&mut objects, &sorting);

            let mut seen = Vec::new();
            let mut cursor: Option<Cursor> = None;
            loop {
                let matcher = match &cursor {
                    Some(cursor) => PaginationMatcher::new(&cursor.rules(&sorting)).unwrap(),
                    None => PaginationMatcher::default(),
                };
                let page: Vec<_> = objects.iter().filter(|o| matcher.matches(o)).take(5).collect();
                if page.is_empty() {
                    break;
                }
                cursor = Some(Cursor::from_object(page[page.len() - 1], &sorting));
                seen.extend(page.into_iter().cloned());
            }
            assert_eq!(seen, objects, "sorting {sorting:?}");
        }
    }

    #[test]
    fn test_cursor_token_roundtrip() {
        let last = object(json!({"id": "x", "person": {"age": 7}, "last_modified": 9}));
        let sorting = with_tiebreak(&[Sort::asc("person.age")]);
        let cursor = Cursor::from_object(&last, &sorting);
        let token = cursor.encode().unwrap();

        let decoded = Cursor::decode(&token).unwrap();
        assert_eq!(decoded, cursor);
        assert_eq!(
            decoded.rules(&sorting)[2],
            vec![Filter::new("person.age", 7, Comparison::Gt)]
        );
    }

    #[test]
    fn test_cursor_rejects_garbage() {
        assert!(matches!(
            Cursor::decode("not a cursor!"),
            Err(StorageError::InvalidQuery { .. })
        ));
        let token = URL_SAFE_NO_PAD.encode(b"[1, 2]");
        assert!(Cursor::decode(&token).is_err());
    }
}
