//! The storable value model and its total order.
//!
//! Values are grouped into type classes that never coerce into each other:
//!
//! `Bool < Number < String < Array < Object < Bytes < Null < MISSING`
//!
//! A missing field is not a [`Value`]; it is represented as `None` wherever a
//! field lookup can fail, and [`compare_optional`] places it after every
//! value. Equality is derived from the same order, so `10 == 10.0`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as _, Serialize, Serializer};
use serde_json::Number;

/// Any value a stored object field can hold.
#[derive(Debug, Clone)]
pub enum Value {
    /// Explicit JSON `null`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer or floating point number.
    Number(Number),
    /// UTF-8 string.
    String(String),
    /// Ordered list of values.
    Array(Vec<Value>),
    /// Nested mapping with ordered keys.
    Object(BTreeMap<String, Value>),
    /// Raw binary payload. Accepted from callers but never storable.
    Bytes(Vec<u8>),
}

impl Value {
    /// Rank of the value's type class in the total order.
    fn class_rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Array(_) => 3,
            Value::Object(_) => 4,
            Value::Bytes(_) => 5,
            Value::Null => 6,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Bytes(_) => "bytes",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Truthiness: empty containers, zero, `false` and `null` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Bytes(bytes) => !bytes.is_empty(),
        }
    }

    /// Returns the dotted path of the first raw binary value, if any.
    ///
    /// `prefix` is the path of `self`; the root passes its field name.
    pub fn find_bytes(&self, prefix: &str) -> Option<String> {
        match self {
            Value::Bytes(_) => Some(prefix.to_string()),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .find_map(|(i, item)| item.find_bytes(&format!("{prefix}.{i}"))),
            Value::Object(map) => map
                .iter()
                .find_map(|(key, item)| item.find_bytes(&format!("{prefix}.{key}"))),
            _ => None,
        }
    }
}

/// Compares two numbers exactly when both are integers, otherwise as floats.
fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    fn as_int(n: &Number) -> Option<i128> {
        n.as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
    }

    if let (Some(x), Some(y)) = (as_int(a), as_int(b)) {
        return x.cmp(&y);
    }
    let x = a.as_f64().unwrap_or(f64::NAN);
    let y = b.as_f64().unwrap_or(f64::NAN);
    x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Object(a), Value::Object(b)) => a.iter().cmp(b.iter()),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            _ => self.class_rank().cmp(&other.class_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

/// Compares two possibly-missing field values. Missing sorts after everything.
pub fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "<{}>", self.type_name()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Object(map) => serializer.collect_map(map),
            Value::Bytes(_) => Err(S::Error::custom("raw binary values cannot be serialized")),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(f: f64) -> Self {
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_type_classes_are_ordered() {
        let ordered = [
            v(json!(true)),
            v(json!(-5)),
            v(json!("")),
            v(json!([])),
            v(json!({})),
            Value::Bytes(vec![1]),
            Value::Null,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{:?} < {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_numbers_compare_across_representations() {
        assert_eq!(v(json!(10)), v(json!(10.0)));
        assert!(v(json!(9.5)) < v(json!(10)));
        assert!(v(json!(-1)) < v(json!(u64::MAX)));
        assert!(v(json!(1.5)) > v(json!(1)));
    }

    #[test]
    fn test_no_coercion_between_numbers_and_strings() {
        assert_ne!(v(json!(0)), v(json!("0")));
        assert!(v(json!(50.0)) < v(json!("49.0")));
        // Strings order lexicographically, never numerically.
        assert!(v(json!("53.0b4")) > v(json!("50.0")));
        assert!(v(json!("6.0")) > v(json!("50.0")));
    }

    #[test]
    fn test_missing_sorts_after_null() {
        let null = Value::Null;
        assert_eq!(compare_optional(Some(&null), None), Ordering::Less);
        assert_eq!(compare_optional(None, Some(&null)), Ordering::Greater);
        assert_eq!(compare_optional(None, None), Ordering::Equal);
    }

    #[test]
    fn test_containers_compare_structurally() {
        assert_eq!(v(json!([1, 2])), v(json!([1.0, 2])));
        assert!(v(json!([1])) < v(json!([1, 2])));
        assert_eq!(
            v(json!({"ibu": 25, "seen_on": "2017-06-01"})),
            v(json!({"seen_on": "2017-06-01", "ibu": 25}))
        );
        assert_ne!(v(json!({})), v(json!([])));
    }

    #[test]
    fn test_truthiness() {
        assert!(v(json!(true)).is_truthy());
        assert!(v(json!("null")).is_truthy());
        assert!(!v(json!(0)).is_truthy());
        assert!(!v(json!("")).is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn test_bytes_cannot_be_serialized() {
        let value = Value::Object(BTreeMap::from([(
            "steak".to_string(),
            Value::Bytes(b"raw".to_vec()),
        )]));
        assert!(serde_json::to_string(&value).is_err());
        assert_eq!(value.find_bytes("body").as_deref(), Some("body.steak"));
    }

    #[test]
    fn test_serde_roundtrip_preserves_json() {
        let original = json!({"a": [1, "two", null, {"b": false}], "c": 1.5});
        let value: Value = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(serde_json::to_value(&value).unwrap(), original);
    }
}
