//! Lowering the node tree into executable ops.
//!
//! Codegen is where filter chains stop being raw text: every captured
//! suffix is resolved into ordered calls under the engine's escaping
//! policy, so an artifact already carries the implicit escape filter (or
//! not) and never mentions the `raw` sentinel. The op tree mirrors the
//! node tree otherwise; no optimization passes.

use crate::ast::{ConditionArm, Node, Operand, Token};
use crate::filters::resolve_chain;
use crate::program::{Op, OpArm, OpOperand, OpToken, Program};

/// Lower a parsed template into a compiled program.
pub(crate) fn lower(nodes: &[Node], escape_html: bool) -> Program {
    Program { ops: lower_nodes(nodes, escape_html) }
}

fn lower_nodes(nodes: &[Node], escape_html: bool) -> Vec<Op> {
    nodes.iter().map(|node| lower_node(node, escape_html)).collect()
}

fn lower_node(node: &Node, escape_html: bool) -> Op {
    match node {
        Node::Literal(text) => Op::Emit(text.clone()),

        Node::Interpolation(operand) => Op::Interp(lower_operand(operand, escape_html)),

        Node::Condition { arms, otherwise } => Op::If {
            arms: arms.iter().map(|arm| lower_arm(arm, escape_html)).collect(),
            otherwise: lower_nodes(otherwise, escape_html),
        },

        Node::Loop { binding, collection, body } => Op::For {
            binding: binding.clone(),
            collection: lower_operand(collection, escape_html),
            body: lower_nodes(body, escape_html),
        },

        Node::Assignment { target, source } => Op::Set {
            target: target.clone(),
            source: lower_operand(source, escape_html),
        },
    }
}

fn lower_arm(arm: &ConditionArm, escape_html: bool) -> OpArm {
    OpArm {
        left: lower_operand(&arm.left, escape_html),
        compare: arm
            .compare
            .as_ref()
            .map(|(cmp, right)| (*cmp, lower_operand(right, escape_html))),
        body: lower_nodes(&arm.body, escape_html),
    }
}

fn lower_operand(operand: &Operand, escape_html: bool) -> OpOperand {
    OpOperand {
        token: lower_token(&operand.token),
        filters: resolve_chain(&operand.filters, escape_html),
    }
}

fn lower_token(token: &Token) -> OpToken {
    match token {
        Token::Literal(s) => OpToken::Literal(s.clone()),
        Token::Number(n) => OpToken::Number(n.clone()),
        Token::Path(segments) => OpToken::Path(segments.clone()),
    }
}
