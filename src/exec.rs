//! Program execution.
//!
//! The executor interprets a compiled program against a caller-supplied
//! scope plus a layer of render-local bindings (loop variables, `set`
//! targets). Output streams to any writer; runtime errors — an unknown
//! filter name, a filter precondition failure — propagate uncaught to the
//! render caller. Execution is single-threaded and synchronous; a run
//! completes or fails outright, never partially succeeds.

use crate::ast::Comparator;
use crate::error::{Result, StencilError};
use crate::filters::FilterRegistry;
use crate::program::{Op, OpArm, OpOperand, OpToken, Program};
use crate::scope::{Scope, as_number, is_truthy, lookup, to_output};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;

/// Names bound for each loop iteration, restored when the loop exits.
const LOOP_META: [&str; 7] = [
    "thisKey",
    "thisPosition",
    "thisCount",
    "thisIsFirst",
    "thisIsLast",
    "thisIsOdd",
    "thisIsEven",
];

/// Run a compiled program against a scope, streaming output to `out`.
pub fn run<W: Write>(
    program: &Program,
    scope: &Scope,
    registry: &FilterRegistry,
    out: &mut W,
) -> Result<()> {
    let mut executor = Executor { scope, registry, locals: HashMap::new() };
    executor.exec(&program.ops, out)
}

/// Run a compiled program and capture the output as a string.
pub fn run_to_string(program: &Program, scope: &Scope, registry: &FilterRegistry) -> Result<String> {
    let mut buffer = Vec::new();
    run(program, scope, registry, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

struct Executor<'a> {
    scope: &'a Scope,
    registry: &'a FilterRegistry,
    locals: HashMap<String, Value>,
}

impl Executor<'_> {
    fn exec<W: Write>(&mut self, ops: &[Op], out: &mut W) -> Result<()> {
        for op in ops {
            match op {
                Op::Emit(text) => write_out(out, text)?,
                Op::Interp(operand) => self.exec_interp(operand, out)?,
                Op::If { arms, otherwise } => self.exec_if(arms, otherwise, out)?,
                Op::For { binding, collection, body } => {
                    self.exec_for(binding, collection, body, out)?
                }
                Op::Set { target, source } => self.exec_set(target, source)?,
            }
        }
        Ok(())
    }

    /// Interpolation guards existence before filtering: a path that does
    /// not fully resolve emits nothing and its filters never run.
    fn exec_interp<W: Write>(&mut self, operand: &OpOperand, out: &mut W) -> Result<()> {
        let value = match &operand.token {
            OpToken::Literal(s) => Value::String(s.clone()),
            OpToken::Number(n) => Value::Number(n.clone()),
            OpToken::Path(path) => match lookup(path, &self.locals, self.scope) {
                Some(found) => found.clone(),
                None => return Ok(()),
            },
        };

        let filtered = self.registry.apply_chain(&operand.filters, value)?;
        write_out(out, &to_output(&filtered))
    }

    /// Condition and assignment operands do not guard existence: a missing
    /// path evaluates as null and the filters still run, so a fallback
    /// filter sees the miss.
    fn operand_value(&self, operand: &OpOperand) -> Result<Value> {
        let value = match &operand.token {
            OpToken::Literal(s) => Value::String(s.clone()),
            OpToken::Number(n) => Value::Number(n.clone()),
            OpToken::Path(path) => lookup(path, &self.locals, self.scope)
                .cloned()
                .unwrap_or(Value::Null),
        };
        self.registry.apply_chain(&operand.filters, value)
    }

    fn exec_if<W: Write>(&mut self, arms: &[OpArm], otherwise: &[Op], out: &mut W) -> Result<()> {
        for arm in arms {
            let left = self.operand_value(&arm.left)?;
            let taken = match &arm.compare {
                Some((cmp, right_operand)) => {
                    let right = self.operand_value(right_operand)?;
                    compare(&left, *cmp, &right)
                }
                None => is_truthy(&left),
            };
            if taken {
                return self.exec(&arm.body, out);
            }
        }
        self.exec(otherwise, out)
    }

    fn exec_for<W: Write>(
        &mut self,
        binding: &str,
        collection: &OpOperand,
        body: &[Op],
        out: &mut W,
    ) -> Result<()> {
        // The guard checks the unfiltered collection: it must be set and
        // be a sequence, or the loop (and its body) is skipped entirely.
        let raw = match &collection.token {
            OpToken::Path(path) => lookup(path, &self.locals, self.scope).cloned(),
            _ => None,
        };
        let Some(raw) = raw else { return Ok(()) };
        if !raw.is_array() {
            return Ok(());
        }

        // Iteration walks the filtered value; a filter that turned the
        // sequence into something else leaves nothing to iterate.
        let filtered = self.registry.apply_chain(&collection.filters, raw)?;
        let Value::Array(items) = filtered else { return Ok(()) };

        let saved = self.save_loop_bindings(binding);

        let count = items.len();
        for (index, item) in items.into_iter().enumerate() {
            let position = index + 1;
            self.locals.insert(binding.to_string(), item);
            self.locals.insert("thisKey".to_string(), Value::from(index));
            self.locals.insert("thisPosition".to_string(), Value::from(position));
            self.locals.insert("thisCount".to_string(), Value::from(count));
            self.locals.insert("thisIsFirst".to_string(), Value::Bool(position == 1));
            self.locals.insert("thisIsLast".to_string(), Value::Bool(position == count));
            self.locals.insert("thisIsOdd".to_string(), Value::Bool(position % 2 == 1));
            self.locals.insert("thisIsEven".to_string(), Value::Bool(position % 2 == 0));

            let result = self.exec(body, out);
            if result.is_err() {
                self.restore_loop_bindings(saved);
                return result;
            }
        }

        self.restore_loop_bindings(saved);
        Ok(())
    }

    /// Snapshot the item binding and per-iteration names so the loop can
    /// restore them on exit; the bindings are scoped strictly to the body.
    fn save_loop_bindings(&self, binding: &str) -> Vec<(String, Option<Value>)> {
        std::iter::once(binding)
            .chain(LOOP_META)
            .map(|name| (name.to_string(), self.locals.get(name).cloned()))
            .collect()
    }

    fn restore_loop_bindings(&mut self, saved: Vec<(String, Option<Value>)>) {
        for (name, previous) in saved {
            match previous {
                Some(value) => self.locals.insert(name, value),
                None => self.locals.remove(&name),
            };
        }
    }

    fn exec_set(&mut self, target: &[String], source: &OpOperand) -> Result<()> {
        let value = self.operand_value(source)?;

        let Some((first, rest)) = target.split_first() else {
            return Ok(());
        };

        if rest.is_empty() {
            self.locals.insert(first.clone(), value);
            return Ok(());
        }

        // A dotted target shadows the scope entry: take the current value
        // of the head segment into locals and graft the assignment in.
        let mut base = self
            .locals
            .get(first)
            .or_else(|| self.scope.get(first.as_str()))
            .cloned()
            .unwrap_or(Value::Null);
        set_path(&mut base, rest, value);
        self.locals.insert(first.clone(), base);
        Ok(())
    }
}

fn set_path(base: &mut Value, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *base = value;
        return;
    };

    if !base.is_object() {
        *base = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(map) = base {
        let entry = map.entry(first.clone()).or_insert(Value::Null);
        set_path(entry, rest, value);
    }
}

/// Loose comparison: numeric when both sides coerce to numbers, string
/// form otherwise.
fn compare(left: &Value, cmp: Comparator, right: &Value) -> bool {
    if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
        return match cmp {
            Comparator::Eq => l == r,
            Comparator::Ge => l >= r,
            Comparator::Le => l <= r,
            Comparator::Ne => l != r,
        };
    }

    let (l, r) = (to_output(left), to_output(right));
    match cmp {
        Comparator::Eq => l == r,
        Comparator::Ge => l >= r,
        Comparator::Le => l <= r,
        Comparator::Ne => l != r,
    }
}

fn write_out<W: Write>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(text.as_bytes())
        .map_err(|e| StencilError::Io { path: "<output>".to_string(), source: e })
}
