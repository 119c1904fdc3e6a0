//! Variable scope and dotted-path resolution.
//!
//! The scope is a JSON-object map supplied fresh by the caller for each
//! render; the engine never owns or mutates it. Values are
//! `serde_json::Value`, which covers the full scope model: strings,
//! numbers, nested mappings and sequences.
//!
//! Dotted paths resolve left to right: the first segment looks the name up
//! in the render's local bindings and then in the caller scope; each later
//! segment performs a nested-key lookup on the prior result. A numeric
//! segment additionally indexes into a sequence. Existence-checking
//! contexts treat any missing segment as "not set", never as an error.

use serde_json::Value;
use std::collections::HashMap;

/// Caller-supplied variable scope for one render call.
pub type Scope = serde_json::Map<String, Value>;

/// Resolve a dotted path against locals-then-scope.
///
/// Locals (loop bindings, `set` targets) shadow the caller scope for the
/// first segment only; nested segments always descend into the resolved
/// value.
pub(crate) fn lookup<'a>(
    path: &[String],
    locals: &'a HashMap<String, Value>,
    scope: &'a Scope,
) -> Option<&'a Value> {
    let first = path.first()?;
    let mut current = locals.get(first.as_str()).or_else(|| scope.get(first.as_str()))?;

    for segment in &path[1..] {
        current = match current {
            Value::Object(map) => map.get(segment.as_str())?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Loose truthiness: null, false, zero, the empty string and empty
/// containers are false; everything else is true.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Render a value as output text.
///
/// Strings emit verbatim, null emits nothing, scalars use their canonical
/// form, and composite values fall back to their JSON encoding.
pub(crate) fn to_output(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Coerce a value to a number if it is numeric or a numeric string.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
