//! Filter chain resolution and the injected filter registry.
//!
//! A filter is a named transformation applied to a value before output or
//! comparison. The registry maps names to typed functions and is injected
//! into the engine; callers may extend it or start from an empty one.
//! Lookup failures surface at execution time as
//! [`StencilError::UnknownFilter`], never at compile time.

use crate::error::{Result, StencilError};
use serde_json::Value;
use std::collections::HashMap;

mod builtin;
mod chain;


pub use chain::{ESCAPE_FILTER, FilterCall, RAW_SENTINEL, resolve_chain};

/// A filter implementation: current value plus literal arguments in, new
/// value out.
pub type FilterFn = fn(&Value, &[Value]) -> Result<Value>;

/// Name-to-function mapping injected into the engine.
#[derive(Clone)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FilterRegistry").field("filters", &names).finish()
    }
}

impl FilterRegistry {
    /// An empty registry. Note that the escaping policy still emits calls
    /// to `escape`, so an empty registry renders escaped templates only
    /// with escaping disabled or `raw` everywhere.
    pub fn empty() -> Self {
        Self { filters: HashMap::new() }
    }

    /// The builtin filter set.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("escape", builtin::escape);
        registry.register("upper", builtin::upper);
        registry.register("lower", builtin::lower);
        registry.register("capitalize", builtin::capitalize);
        registry.register("title", builtin::title);
        registry.register("trim", builtin::trim);
        registry.register("length", builtin::length);
        registry.register("join", builtin::join);
        registry.register("json", builtin::json);
        registry.register("byDefault", builtin::by_default);
        registry.register("default", builtin::by_default);
        registry.register("abs", builtin::abs);
        registry.register("numberFormat", builtin::number_format);
        registry.register("stripTags", builtin::strip_tags);
        registry.register("urlEncode", builtin::url_encode);
        registry.register("date", builtin::date);
        registry.register("modifyDate", builtin::modify_date);
        registry
    }

    /// Register or replace a filter under `name`.
    pub fn register(&mut self, name: &str, filter: FilterFn) {
        self.filters.insert(name.to_string(), filter);
    }

    /// Apply one resolved call to a value.
    pub fn apply(&self, call: &FilterCall, value: &Value) -> Result<Value> {
        let filter = self
            .filters
            .get(&call.name)
            .ok_or_else(|| StencilError::UnknownFilter(call.name.clone()))?;
        filter(value, &call.args)
    }

    /// Apply a resolved chain in declared order.
    pub fn apply_chain(&self, calls: &[FilterCall], value: Value) -> Result<Value> {
        let mut current = value;
        for call in calls {
            current = self.apply(call, &current)?;
        }
        Ok(current)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
