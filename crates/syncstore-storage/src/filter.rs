//! Filters and their evaluation against stored objects.
//!
//! A query's filters are compiled once into a [`FilterMatcher`] (LIKE
//! patterns become regular expressions at that point) and then applied to
//! every candidate object. Pagination rule groups are compiled into a
//! [`PaginationMatcher`] which ORs its groups.

use std::cmp::Ordering;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::object::Object;
use crate::value::{Value, compare_optional};

/// Filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparison {
    Eq,
    Not,
    Lt,
    Gt,
    /// Inclusive lower bound (`>=`).
    Min,
    /// Inclusive upper bound (`<=`).
    Max,
    In,
    Exclude,
    /// Field presence, driven by the truthiness of the operand.
    Has,
    /// Case-insensitive wildcard match on strings.
    Like,
    /// Array field holds every operand element.
    Contains,
    /// Array field holds at least one operand element.
    ContainsAny,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eq => "eq",
            Self::Not => "not",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Min => "min",
            Self::Max => "max",
            Self::In => "in",
            Self::Exclude => "exclude",
            Self::Has => "has",
            Self::Like => "like",
            Self::Contains => "contains",
            Self::ContainsAny => "contains_any",
        };
        f.write_str(name)
    }
}

/// A single `(field, value, operator)` condition.
///
/// `value: None` is the MISSING sentinel: it equals only absent fields and
/// orders after every value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: Option<Value>,
    pub operator: Comparison,
}

impl Filter {
    pub fn new(field: impl Into<String>, value: impl Into<Value>, operator: Comparison) -> Self {
        Self {
            field: field.into(),
            value: Some(value.into()),
            operator,
        }
    }

    /// A filter against the MISSING sentinel.
    pub fn missing(field: impl Into<String>, operator: Comparison) -> Self {
        Self {
            field: field.into(),
            value: None,
            operator,
        }
    }

    /// Evaluates this filter alone. Prefer [`FilterMatcher`] for many objects.
    pub fn matches(&self, object: &Object) -> Result<bool, StorageError> {
        Ok(CompiledFilter::compile(self)?.matches(object))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} {}", self.field, self.operator, value),
            None => write!(f, "{} {} MISSING", self.field, self.operator),
        }
    }
}

/// Operand list for set-style operators; a scalar is a list of one.
fn operand_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
        None => Vec::new(),
    }
}

/// Builds the anchored, case-insensitive expression for a LIKE pattern.
fn like_regex(pattern: &str) -> Result<Regex, StorageError> {
    let pattern = if pattern.contains('*') {
        pattern.to_string()
    } else {
        format!("*{pattern}*")
    };
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    RegexBuilder::new(&format!("^{body}$"))
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| StorageError::invalid_query(format!("invalid LIKE pattern: {e}")))
}

#[derive(Debug)]
enum Predicate {
    /// EQ/NOT/LT/GT/MIN/MAX: accepted orderings of `field <=> operand`.
    Order {
        operand: Option<Value>,
        accept: fn(Ordering) -> bool,
    },
    Member {
        candidates: Vec<Value>,
        negate: bool,
    },
    Has(bool),
    Like(Regex),
    Contains {
        candidates: Vec<Value>,
        all: bool,
    },
}

#[derive(Debug)]
struct CompiledFilter {
    field: String,
    predicate: Predicate,
}

impl CompiledFilter {
    fn compile(filter: &Filter) -> Result<Self, StorageError> {
        let operand = filter.value.as_ref();
        let order = |accept: fn(Ordering) -> bool| Predicate::Order {
            operand: filter.value.clone(),
            accept,
        };
        let predicate = match filter.operator {
            Comparison::Eq => order(Ordering::is_eq),
            Comparison::Not => order(Ordering::is_ne),
            Comparison::Lt => order(Ordering::is_lt),
            Comparison::Gt => order(Ordering::is_gt),
            Comparison::Min => order(Ordering::is_ge),
            Comparison::Max => order(Ordering::is_le),
            Comparison::In | Comparison::Exclude => Predicate::Member {
                candidates: operand_list(operand),
                negate: filter.operator == Comparison::Exclude,
            },
            Comparison::Has => Predicate::Has(operand.is_some_and(Value::is_truthy)),
            Comparison::Like => match operand {
                Some(Value::String(pattern)) => Predicate::Like(like_regex(pattern)?),
                Some(other) => {
                    return Err(StorageError::invalid_query(format!(
                        "LIKE on '{}' expects a string pattern, got {}",
                        filter.field,
                        other.type_name()
                    )));
                }
                None => {
                    return Err(StorageError::invalid_query(format!(
                        "LIKE on '{}' needs a pattern",
                        filter.field
                    )));
                }
            },
            Comparison::Contains | Comparison::ContainsAny => Predicate::Contains {
                candidates: operand_list(operand),
                all: filter.operator == Comparison::Contains,
            },
        };
        Ok(Self {
            field: filter.field.clone(),
            predicate,
        })
    }

    fn matches(&self, object: &Object) -> bool {
        let actual = object.resolve(&self.field);
        match &self.predicate {
            Predicate::Order { operand, accept } => {
                accept(compare_optional(actual, operand.as_ref()))
            }
            Predicate::Member { candidates, negate } => {
                let found = actual.is_some_and(|value| candidates.contains(value));
                found != *negate
            }
            Predicate::Has(present) => actual.is_some() == *present,
            Predicate::Like(regex) => match actual {
                Some(Value::String(s)) => regex.is_match(s),
                _ => false,
            },
            Predicate::Contains { candidates, all } => {
                let Some(Value::Array(items)) = actual else {
                    return false;
                };
                // Only scalar numbers and strings can be looked up in arrays.
                let check = |candidate: &Value| {
                    matches!(candidate, Value::Number(_) | Value::String(_))
                        && items.contains(candidate)
                };
                if *all {
                    candidates.iter().all(check)
                } else {
                    candidates.iter().any(check)
                }
            }
        }
    }
}

/// A conjunction of compiled filters.
#[derive(Debug, Default)]
pub struct FilterMatcher {
    filters: Vec<CompiledFilter>,
}

impl FilterMatcher {
    /// Compiles filters, rejecting malformed LIKE patterns.
    pub fn new(filters: &[Filter]) -> Result<Self, StorageError> {
        let filters = filters
            .iter()
            .map(CompiledFilter::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { filters })
    }

    /// True when every filter matches. An empty matcher matches everything.
    pub fn matches(&self, object: &Object) -> bool {
        self.filters.iter().all(|filter| filter.matches(object))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// A disjunction of filter groups.
#[derive(Debug, Default)]
pub struct PaginationMatcher {
    groups: Vec<FilterMatcher>,
}

impl PaginationMatcher {
    pub fn new(groups: &[Vec<Filter>]) -> Result<Self, StorageError> {
        let groups = groups
            .iter()
            .map(|group| FilterMatcher::new(group))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { groups })
    }

    /// True when any group matches. No groups means no restriction.
    pub fn matches(&self, object: &Object) -> bool {
        self.groups.is_empty() || self.groups.iter().any(|group| group.matches(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(json: serde_json::Value) -> Object {
        Object::try_from(json).unwrap()
    }

    fn matching(filter: Filter, objects: &[Object]) -> usize {
        let matcher = FilterMatcher::new(&[filter]).unwrap();
        objects.iter().filter(|o| matcher.matches(o)).count()
    }

    #[test]
    fn test_eq_distinguishes_null_and_missing() {
        let objects = [
            object(json!({"salary": null})),
            object(json!({"salary": "null"})),
            object(json!({"salary": ""})),
            object(json!({})),
        ];
        assert_eq!(matching(Filter::new("salary", Value::Null, Comparison::Eq), &objects), 1);
        assert_eq!(matching(Filter::missing("salary", Comparison::Eq), &objects), 1);
        assert_eq!(matching(Filter::new("salary", "", Comparison::Eq), &objects), 1);
        assert_eq!(matching(Filter::new("salary", "", Comparison::Not), &objects), 3);
    }

    #[test]
    fn test_ordering_operators() {
        let objects: Vec<_> = [1, 6, 10, 46]
            .into_iter()
            .map(|code| object(json!({"code": code})))
            .chain([object(json!({"missing": "code"}))])
            .collect();
        assert_eq!(matching(Filter::new("code", 10, Comparison::Max), &objects), 3);
        assert_eq!(matching(Filter::new("code", 10, Comparison::Lt), &objects), 2);
        // Missing is greater than every value.
        assert_eq!(matching(Filter::new("code", 10, Comparison::Gt), &objects), 2);
        assert_eq!(matching(Filter::new("code", 10, Comparison::Min), &objects), 3);
        assert_eq!(matching(Filter::missing("code", Comparison::Lt), &objects), 4);
    }

    #[test]
    fn test_numbers_do_not_match_numeric_strings() {
        let objects = [
            object(json!({"product": {"version": "49.0"}})),
            object(json!({"product": {"version": "6.0"}})),
            object(json!({"product": {"version": "53.0b4"}})),
        ];
        assert_eq!(
            matching(Filter::new("product.version", "50.0", Comparison::Min), &objects),
            2
        );
        assert_eq!(
            matching(Filter::new("product.version", 50.0, Comparison::Min), &objects),
            3
        );
        assert_eq!(
            matching(Filter::new("product.version", 50.0, Comparison::Max), &objects),
            0
        );
    }

    #[test]
    fn test_in_and_exclude_are_complements() {
        let objects = [
            object(json!({"code": 1})),
            object(json!({"code": 2})),
            object(json!({"code": 3})),
            object(json!({})),
        ];
        let candidates = Value::from(vec![Value::from(1), Value::from("b")]);
        assert_eq!(matching(Filter::new("code", candidates.clone(), Comparison::In), &objects), 1);
        assert_eq!(matching(Filter::new("code", candidates, Comparison::Exclude), &objects), 3);
        assert_eq!(
            matching(Filter::new("code", Vec::<Value>::new(), Comparison::In), &objects),
            0
        );
    }

    #[test]
    fn test_has_uses_operand_truthiness() {
        let objects = [
            object(json!({"flavor": "strawberry"})),
            object(json!({"flavor": "blueberry", "author": null})),
            object(json!({"flavor": "raspberry", "author": ""})),
            object(json!({"flavor": "watermelon", "author": "hello"})),
        ];
        assert_eq!(matching(Filter::new("author", true, Comparison::Has), &objects), 3);
        assert_eq!(matching(Filter::new("author", false, Comparison::Has), &objects), 1);
    }

    #[test]
    fn test_like_wraps_patterns_without_wildcards() {
        let objects = [
            object(json!({"name": "foo"})),
            object(json!({"name": "aafooll"})),
            object(json!({"name": "bar"})),
            object(json!({"name": "FOOBAR"})),
            object(json!({"name": 12})),
        ];
        assert_eq!(matching(Filter::new("name", "FoO", Comparison::Like), &objects), 3);
    }

    #[test]
    fn test_like_wildcards_are_anchored_and_escaped() {
        let objects = [
            object(json!({"name": "eabcg"})),
            object(json!({"name": "aabcc"})),
            object(json!({"name": "abc"})),
            object(json!({"name": "aec"})),
            object(json!({"name": "a.b+c"})),
        ];
        assert_eq!(matching(Filter::new("name", "a*b*c", Comparison::Like), &objects), 3);
        assert_eq!(matching(Filter::new("name", "a.b+c", Comparison::Like), &objects), 1);
    }

    #[test]
    fn test_like_rejects_non_string_pattern() {
        let err = FilterMatcher::new(&[Filter::new("name", 3, Comparison::Like)]).unwrap_err();
        assert!(matches!(err, StorageError::InvalidQuery { .. }));
    }

    #[test]
    fn test_contains_and_contains_any() {
        let objects = [
            object(json!({"colors": ["red", "green", "blue"]})),
            object(json!({"colors": ["gray", "blue"]})),
            object(json!({"colors": ["red", "gray", "blue"]})),
            object(json!({"colors": {"html": "#00FF00"}})),
            object(json!({"code": "black"})),
        ];
        let colors = |items: &[&str]| Value::from(json!(items));
        let count = |value: Value, operator: Comparison| {
            matching(Filter::new("colors", value, operator), &objects)
        };

        assert_eq!(count(colors(&["red"]), Comparison::Contains), 2);
        assert_eq!(count(colors(&["red", "gray"]), Comparison::Contains), 1);
        assert_eq!(count(colors(&["red", "gray"]), Comparison::ContainsAny), 3);
        assert_eq!(count(Value::from("blue"), Comparison::ContainsAny), 3);
    }

    #[test]
    fn test_contains_never_matches_unsupported_types() {
        let objects = [object(json!({"fib": [2, 3, {"demo": "foobar"}]}))];
        let count = |value: Value, operator: Comparison| {
            matching(Filter::new("fib", value, operator), &objects)
        };
        let unsupported = Value::from(json!([{"demo": "foobar"}]));

        assert_eq!(count(unsupported.clone(), Comparison::Contains), 0);
        assert_eq!(count(unsupported, Comparison::ContainsAny), 0);
        assert_eq!(count(Value::from(json!([2.0])), Comparison::Contains), 1);
    }

    #[test]
    fn test_pagination_matcher_ors_groups() {
        let objects = [
            object(json!({"a": 1, "b": 1})),
            object(json!({"a": 2, "b": 1})),
            object(json!({"a": 3, "b": 3})),
        ];
        let groups = vec![
            vec![Filter::new("a", 1, Comparison::Eq)],
            vec![Filter::new("b", 3, Comparison::Eq)],
        ];
        let matcher = PaginationMatcher::new(&groups).unwrap();
        assert_eq!(objects.iter().filter(|o| matcher.matches(o)).count(), 2);
        assert!(PaginationMatcher::new(&[]).unwrap().matches(&objects[1]));
    }
}
