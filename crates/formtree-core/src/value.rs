//! Predicates over raw JSON form values.

use serde_json::Value;

/// True for values a user has not filled in: `null` or the empty string.
///
/// A missing field is nil as well; callers pass `None` for it.
pub fn is_nil(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Loose truthiness used for touched tracking.
///
/// `null`, `false`, numeric zero and `""` are falsy; arrays and
/// objects are always truthy, even when empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
