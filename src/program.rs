//! Compiled artifact representation.
//!
//! A [`Program`] is the executable form of a template: a tree of ops with
//! every filter chain already resolved (escaping policy applied, the `raw`
//! sentinel stripped) and every variable token classified. Programs are
//! plain data — serde-serializable so the artifact cache can persist them
//! as JSON and reload them byte-for-byte equivalent in a later process.

use crate::ast::Comparator;
use crate::filters::FilterCall;
use serde::{Deserialize, Serialize};

/// A variable token in compiled form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpToken {
    /// Quoted literal, used verbatim.
    Literal(String),
    /// Numeric literal, integral or float as written.
    Number(serde_json::Number),
    /// Dotted lookup path.
    Path(Vec<String>),
}

/// A compiled operand: token plus its resolved filter calls, in
/// application order (first call consumes the raw value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpOperand {
    pub token: OpToken,
    pub filters: Vec<FilterCall>,
}

/// One compiled condition arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpArm {
    pub left: OpOperand,
    pub compare: Option<(Comparator, OpOperand)>,
    pub body: Vec<Op>,
}

/// A single executable instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// Emit literal text.
    Emit(String),
    /// Emit the filtered value of an operand, or nothing if its path does
    /// not fully resolve.
    Interp(OpOperand),
    /// Evaluate arms in order, run the first one whose test passes, else
    /// the otherwise body.
    If { arms: Vec<OpArm>, otherwise: Vec<Op> },
    /// Iterate a sequence, binding the item name and the per-iteration
    /// facts for the body.
    For { binding: String, collection: OpOperand, body: Vec<Op> },
    /// Bind a local to the filtered value of the source operand.
    Set { target: Vec<String>, source: OpOperand },
}

/// A compiled template, ready for execution or persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub ops: Vec<Op>,
}
