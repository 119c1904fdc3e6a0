//! Tests for the compilation pipeline: lexing, include expansion, parsing
//! and lowering.

use super::parser::{Segment, lex, parse};
use super::*;
use crate::ast::{Comparator, Node, Token};
use crate::error::StencilError;
use crate::program::{Op, OpToken};
use crate::resolver::DirectoryResolver;
use std::fs;
use tempfile::TempDir;

fn grammar() -> DirectiveGrammar {
    DirectiveGrammar::new().unwrap()
}

// --- Lexer ------------------------------------------------------------------

#[test]
fn lex_splits_text_and_tags() {
    let segments = lex("Hello {{ name }}!{% endif %}");
    assert_eq!(
        segments,
        vec![
            Segment::Text("Hello ".to_string()),
            Segment::Expression("{{ name }}".to_string()),
            Segment::Text("!".to_string()),
            Segment::Statement("{% endif %}".to_string()),
        ]
    );
}

#[test]
fn lex_keeps_unclosed_delimiter_literal() {
    let segments = lex("broken {{ name");
    assert_eq!(segments, vec![Segment::Text("broken {{ name".to_string())]);
}

#[test]
fn lex_plain_text_is_one_segment() {
    assert_eq!(lex("no directives here"), vec![Segment::Text("no directives here".to_string())]);
    assert!(lex("").is_empty());
}

// --- Parser -----------------------------------------------------------------

#[test]
fn parse_interpolation_node() {
    let g = grammar();
    let nodes = parse("{{ user.name|upper }}", &g).unwrap();
    match &nodes[0] {
        Node::Interpolation(operand) => {
            assert_eq!(
                operand.token,
                Token::Path(vec!["user".to_string(), "name".to_string()])
            );
            assert_eq!(operand.filters, "|upper");
        }
        other => panic!("expected interpolation, got {other:?}"),
    }
}

#[test]
fn parse_condition_with_elseif_and_else() {
    let g = grammar();
    let nodes = parse(
        "{% if a %}1{% elseif b >= 2 %}2{% else %}3{% endif %}",
        &g,
    )
    .unwrap();

    match &nodes[0] {
        Node::Condition { arms, otherwise } => {
            assert_eq!(arms.len(), 2);
            assert!(arms[0].compare.is_none());
            assert_eq!(arms[0].body, vec![Node::Literal("1".to_string())]);

            let (cmp, right) = arms[1].compare.as_ref().unwrap();
            assert_eq!(*cmp, Comparator::Ge);
            assert_eq!(right.token, Token::Number(2.into()));

            assert_eq!(otherwise, &vec![Node::Literal("3".to_string())]);
        }
        other => panic!("expected condition, got {other:?}"),
    }
}

#[test]
fn parse_nested_blocks() {
    let g = grammar();
    let nodes = parse(
        "{% for item in items %}{% if item %}{{ item }}{% endif %}{% endfor %}",
        &g,
    )
    .unwrap();

    match &nodes[0] {
        Node::Loop { binding, body, .. } => {
            assert_eq!(binding, "item");
            assert!(matches!(&body[0], Node::Condition { .. }));
        }
        other => panic!("expected loop, got {other:?}"),
    }
}

#[test]
fn parse_assignment() {
    let g = grammar();
    let nodes = parse("{% set title = page.title|upper %}", &g).unwrap();
    match &nodes[0] {
        Node::Assignment { target, source } => {
            assert_eq!(target, &vec!["title".to_string()]);
            assert_eq!(source.filters, "|upper");
        }
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn unknown_statement_tags_stay_literal() {
    let g = grammar();
    let nodes = parse("{% bogus directive %}", &g).unwrap();
    assert_eq!(nodes, vec![Node::Literal("{% bogus directive %}".to_string())]);
}

#[test]
fn stray_endif_is_a_syntax_error() {
    let g = grammar();
    let err = parse("text {% endif %}", &g).unwrap_err();
    assert!(matches!(err, StencilError::Syntax(_)));
}

#[test]
fn unterminated_loop_is_a_syntax_error() {
    let g = grammar();
    let err = parse("{% for item in items %}{{ item }}", &g).unwrap_err();
    assert!(matches!(err, StencilError::Syntax(_)));
}

#[test]
fn unterminated_condition_is_a_syntax_error() {
    let g = grammar();
    let err = parse("{% if a %}body", &g).unwrap_err();
    assert!(matches!(err, StencilError::Syntax(_)));
}

// --- Include expansion ------------------------------------------------------

fn views(entries: &[(&str, &str)]) -> (TempDir, DirectoryResolver) {
    let dir = TempDir::new().unwrap();
    for (name, content) in entries {
        let path = dir.path().join(format!("{name}.tpl"));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    let resolver = DirectoryResolver::new(dir.path());
    (dir, resolver)
}

#[test]
fn nested_includes_resolve_transitively() {
    let g = grammar();
    let (_dir, resolver) = views(&[
        ("a", "A[{% import b %}]"),
        ("b", "B[{% import c %}]"),
        ("c", "C"),
    ]);

    let compiler = Compiler { grammar: &g, resolver: &resolver, escape_html: false };
    let program = compiler.compile("start {% import a %} end").unwrap();

    // Zero unresolved imports survive into the compiled program, and the
    // spliced text is fully flattened.
    let mut output = String::new();
    for op in &program.ops {
        match op {
            Op::Emit(text) => output.push_str(text),
            other => panic!("expected only literal ops, got {other:?}"),
        }
    }
    assert_eq!(output, "start A[B[C]] end");
}

#[test]
fn spliced_partials_may_introduce_directives() {
    let g = grammar();
    let (_dir, resolver) = views(&[("greeting", "Hello {{ name }}")]);

    let compiler = Compiler { grammar: &g, resolver: &resolver, escape_html: false };
    let program = compiler.compile("{% import greeting %}!").unwrap();

    assert!(matches!(program.ops[0], Op::Emit(_)));
    assert!(matches!(program.ops[1], Op::Interp(_)));
    assert_eq!(program.ops[2], Op::Emit("!".to_string()));
}

#[test]
fn missing_partial_is_not_found_with_404() {
    let g = grammar();
    let (_dir, resolver) = views(&[]);

    let compiler = Compiler { grammar: &g, resolver: &resolver, escape_html: false };
    let err = compiler.compile("{% import absent %}").unwrap_err();
    assert!(matches!(&err, StencilError::NotFound(_)));
    assert_eq!(err.status_code(), 404);
}

// --- Codegen ----------------------------------------------------------------

#[test]
fn codegen_applies_escaping_policy() {
    let g = grammar();
    let (_dir, resolver) = views(&[]);
    let compiler = Compiler { grammar: &g, resolver: &resolver, escape_html: true };

    let program = compiler.compile("{{ name }}{{ html|raw }}").unwrap();

    match &program.ops[0] {
        Op::Interp(operand) => {
            assert_eq!(operand.filters.len(), 1);
            assert_eq!(operand.filters[0].name, "escape");
        }
        other => panic!("expected interp, got {other:?}"),
    }
    match &program.ops[1] {
        Op::Interp(operand) => assert!(operand.filters.is_empty()),
        other => panic!("expected interp, got {other:?}"),
    }
}

#[test]
fn codegen_policy_reaches_condition_operands() {
    let g = grammar();
    let (_dir, resolver) = views(&[]);
    let compiler = Compiler { grammar: &g, resolver: &resolver, escape_html: true };

    let program = compiler.compile("{% if a = b %}x{% endif %}").unwrap();
    match &program.ops[0] {
        Op::If { arms, .. } => {
            assert_eq!(arms[0].left.filters[0].name, "escape");
            let (_, right) = arms[0].compare.as_ref().unwrap();
            assert_eq!(right.filters[0].name, "escape");
        }
        other => panic!("expected if, got {other:?}"),
    }
}

#[test]
fn codegen_classifies_tokens() {
    let g = grammar();
    let (_dir, resolver) = views(&[]);
    let compiler = Compiler { grammar: &g, resolver: &resolver, escape_html: false };

    let program = compiler.compile(r#"{{ "quoted" }}{{ a.b }}"#).unwrap();
    match (&program.ops[0], &program.ops[1]) {
        (Op::Interp(first), Op::Interp(second)) => {
            assert_eq!(first.token, OpToken::Literal("quoted".to_string()));
            assert_eq!(
                second.token,
                OpToken::Path(vec!["a".to_string(), "b".to_string()])
            );
        }
        other => panic!("expected two interps, got {other:?}"),
    }
}
