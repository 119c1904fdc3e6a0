//! Filter-chain capture resolution.
//!
//! A captured suffix like `|upper|join(", ")` becomes an ordered list of
//! [`FilterCall`]s. Order is application order: the first call consumes
//! the raw value, each later call wraps the previous result. The escaping
//! policy lives here too: when escaping is enabled and the `raw` sentinel
//! is absent, the implicit `escape` call is appended as the outermost
//! wrapper. `raw` itself is a sentinel only — it is stripped from the
//! resolved chain and never invoked as a filter.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel name suppressing the implicit escape filter.
pub const RAW_SENTINEL: &str = "raw";

/// Name of the implicit escape filter appended by the policy.
pub const ESCAPE_FILTER: &str = "escape";

/// One resolved filter invocation: a registry name plus literal arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Value>,
}

static CHAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\|(?P<name>[a-zA-Z]+)(?:\((?P<args>[^)]*)\))?").expect("filter chain pattern")
});

/// Resolve a raw captured suffix into ordered filter calls under the
/// engine's escaping policy.
pub fn resolve_chain(raw: &str, escape_enabled: bool) -> Vec<FilterCall> {
    let mut calls: Vec<FilterCall> = Vec::new();
    let mut saw_raw = false;

    for caps in CHAIN.captures_iter(raw) {
        let name = &caps["name"];
        if name == RAW_SENTINEL {
            saw_raw = true;
            continue;
        }
        let args = caps
            .name("args")
            .map(|m| parse_args(m.as_str()))
            .unwrap_or_default();
        calls.push(FilterCall { name: name.to_string(), args });
    }

    if escape_enabled && !saw_raw {
        calls.push(FilterCall { name: ESCAPE_FILTER.to_string(), args: Vec::new() });
    }

    calls
}

/// Split literal argument text on commas, respecting quotes.
fn parse_args(raw: &str) -> Vec<Value> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in raw.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                ',' => {
                    push_arg(&mut args, &current);
                    current.clear();
                }
                _ => current.push(ch),
            },
        }
    }
    push_arg(&mut args, &current);

    args
}

fn push_arg(args: &mut Vec<Value>, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }

    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'\'' && last == b'\'') || (first == b'"' && last == b'"') {
            args.push(Value::String(trimmed[1..trimmed.len() - 1].to_string()));
            return;
        }
    }

    if let Ok(n) = trimmed.parse::<i64>() {
        args.push(Value::from(n));
    } else if let Ok(f) = trimmed.parse::<f64>() {
        args.push(Value::from(f));
    } else if trimmed == "true" || trimmed == "false" {
        args.push(Value::Bool(trimmed == "true"));
    } else {
        args.push(Value::String(trimmed.to_string()));
    }
}
