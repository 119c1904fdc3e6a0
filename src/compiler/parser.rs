//! Lexing and recursive-descent parsing of directive syntax.
//!
//! The lexer splits source text into literal text and delimited tags
//! (`{% ... %}` statements, `{{ ... }}` expressions). The parser walks the
//! tag stream once, classifying each tag with the grammar matchers and
//! descending into block bodies, producing the explicit node tree.
//! Nesting and precedence fall out of the tree structure rather than any
//! rewrite ordering.
//!
//! Statement tags that match no known directive form stay in the output
//! as literal text. Mismatched block structure (an `endif` without its
//! `if`, an unterminated `for`) is a syntax error.

use crate::ast::{Comparator, ConditionArm, Node, Operand, Token};
use crate::error::{Result, StencilError};
use crate::grammar::DirectiveGrammar;
use regex::Captures;

/// One lexed span of template source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    /// Literal text between tags.
    Text(String),
    /// A `{% ... %}` statement tag, delimiters included.
    Statement(String),
    /// A `{{ ... }}` expression tag, delimiters included.
    Expression(String),
}

impl Segment {
    pub(crate) fn raw(&self) -> &str {
        match self {
            Segment::Text(s) | Segment::Statement(s) | Segment::Expression(s) => s,
        }
    }
}

/// Split source text into literal and tag segments.
///
/// An opening delimiter without its closer is not a tag; it stays literal,
/// which is what the original matchers did by simply not matching.
pub(crate) fn lex(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = source;

    loop {
        let statement = rest.find("{%");
        let expression = rest.find("{{");

        let (open, close_delim, is_statement) = match (statement, expression) {
            (Some(s), Some(e)) if s <= e => (s, "%}", true),
            (Some(_), Some(e)) => (e, "}}", false),
            (Some(s), None) => (s, "%}", true),
            (None, Some(e)) => (e, "}}", false),
            (None, None) => break,
        };

        let Some(close) = rest[open + 2..].find(close_delim) else {
            break;
        };

        if open > 0 {
            segments.push(Segment::Text(rest[..open].to_string()));
        }

        let end = open + 2 + close + 2;
        let tag = rest[open..end].to_string();
        segments.push(if is_statement {
            Segment::Statement(tag)
        } else {
            Segment::Expression(tag)
        });
        rest = &rest[end..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }

    segments
}

/// The head of an `if`/`elseif` arm before its body is parsed.
#[derive(Debug)]
struct ArmHead {
    left: Operand,
    compare: Option<(Comparator, Operand)>,
}

/// Tag that closed the block body being parsed.
#[derive(Debug)]
enum Terminator {
    Elseif(ArmHead),
    Else,
    Endif,
    Endfor,
}

impl Terminator {
    fn describe(&self) -> &'static str {
        match self {
            Terminator::Elseif(_) => "{% elseif %}",
            Terminator::Else => "{% else %}",
            Terminator::Endif => "{% endif %}",
            Terminator::Endfor => "{% endfor %}",
        }
    }
}

/// Parse include-free source text into the node tree.
pub(crate) fn parse(source: &str, grammar: &DirectiveGrammar) -> Result<Vec<Node>> {
    let mut parser = Parser { grammar, segments: lex(source).into_iter() };
    let (nodes, terminator) = parser.parse_nodes()?;
    match terminator {
        None => Ok(nodes),
        Some(t) => Err(StencilError::Syntax(format!(
            "unexpected {} outside of a block",
            t.describe()
        ))),
    }
}

struct Parser<'g> {
    grammar: &'g DirectiveGrammar,
    segments: std::vec::IntoIter<Segment>,
}

impl Parser<'_> {
    /// Parse nodes until the stream ends or a block terminator appears.
    fn parse_nodes(&mut self) -> Result<(Vec<Node>, Option<Terminator>)> {
        let mut nodes = Vec::new();

        while let Some(segment) = self.segments.next() {
            match segment {
                Segment::Text(text) => nodes.push(Node::Literal(text)),

                Segment::Expression(raw) => {
                    if let Some(caps) = self.grammar.interpolation.captures(&raw) {
                        nodes.push(Node::Interpolation(operand(&caps, "variable", "filters")));
                    } else {
                        nodes.push(Node::Literal(raw));
                    }
                }

                Segment::Statement(raw) => {
                    if let Some(caps) = self.grammar.condition.captures(&raw) {
                        let head = arm_head(&caps);
                        if &caps["condition"] == "if" {
                            nodes.push(self.parse_condition(head)?);
                        } else {
                            return Ok((nodes, Some(Terminator::Elseif(head))));
                        }
                    } else if self.grammar.else_tag.is_match(&raw) {
                        return Ok((nodes, Some(Terminator::Else)));
                    } else if self.grammar.endif.is_match(&raw) {
                        return Ok((nodes, Some(Terminator::Endif)));
                    } else if self.grammar.endfor.is_match(&raw) {
                        return Ok((nodes, Some(Terminator::Endfor)));
                    } else if let Some(caps) = self.grammar.loop_head.captures(&raw) {
                        let binding = binding_name(&caps["value"])?;
                        let collection = operand(&caps, "variable", "filters");
                        nodes.push(self.parse_loop(binding, collection)?);
                    } else if let Some(caps) = self.grammar.assign.captures(&raw) {
                        nodes.push(assignment(&caps)?);
                    } else if self.grammar.import.is_match(&raw) {
                        // Includes are spliced before parsing; reaching one
                        // here means the fixpoint pass was skipped.
                        return Err(StencilError::Syntax(
                            "unresolved import directive reached the parser".to_string(),
                        ));
                    } else {
                        nodes.push(Node::Literal(raw));
                    }
                }
            }
        }

        Ok((nodes, None))
    }

    fn parse_condition(&mut self, first: ArmHead) -> Result<Node> {
        let mut arms = Vec::new();
        let mut otherwise = Vec::new();
        let mut current = first;

        loop {
            let (body, terminator) = self.parse_nodes()?;
            let ArmHead { left, compare } = current;
            arms.push(ConditionArm { left, compare, body });

            match terminator {
                Some(Terminator::Elseif(next)) => current = next,
                Some(Terminator::Else) => {
                    let (else_body, closer) = self.parse_nodes()?;
                    match closer {
                        Some(Terminator::Endif) => {
                            otherwise = else_body;
                            break;
                        }
                        Some(other) => {
                            return Err(StencilError::Syntax(format!(
                                "expected {{% endif %}} after else block, found {}",
                                other.describe()
                            )));
                        }
                        None => {
                            return Err(StencilError::Syntax(
                                "unterminated else block: missing {% endif %}".to_string(),
                            ));
                        }
                    }
                }
                Some(Terminator::Endif) => break,
                Some(Terminator::Endfor) => {
                    return Err(StencilError::Syntax(
                        "unexpected {% endfor %} inside condition block".to_string(),
                    ));
                }
                None => {
                    return Err(StencilError::Syntax(
                        "unterminated condition block: missing {% endif %}".to_string(),
                    ));
                }
            }
        }

        Ok(Node::Condition { arms, otherwise })
    }

    fn parse_loop(&mut self, binding: String, collection: Operand) -> Result<Node> {
        let (body, terminator) = self.parse_nodes()?;
        match terminator {
            Some(Terminator::Endfor) => Ok(Node::Loop { binding, collection, body }),
            Some(other) => Err(StencilError::Syntax(format!(
                "unexpected {} inside loop body",
                other.describe()
            ))),
            None => Err(StencilError::Syntax(
                "unterminated loop: missing {% endfor %}".to_string(),
            )),
        }
    }
}

fn operand(caps: &Captures<'_>, token_name: &str, filters_name: &str) -> Operand {
    Operand::new(
        Token::parse(&caps[token_name]),
        caps.name(filters_name).map(|m| m.as_str()),
    )
}

fn arm_head(caps: &Captures<'_>) -> ArmHead {
    // A comparison needs both the operator and the right operand; a
    // dangling operator degrades to plain truthiness.
    let compare = match (caps.name("compare"), caps.name("comparator")) {
        (Some(op), Some(_)) => Comparator::parse(op.as_str())
            .map(|cmp| (cmp, operand(caps, "comparator", "comparatorFilters"))),
        _ => None,
    };

    ArmHead { left: operand(caps, "variable", "filters"), compare }
}

fn binding_name(raw: &str) -> Result<String> {
    match Token::parse(raw) {
        Token::Path(segments) if segments.len() == 1 => Ok(segments.into_iter().next().unwrap_or_default()),
        _ => Err(StencilError::Syntax(format!(
            "loop binding must be a plain name, got '{raw}'"
        ))),
    }
}

fn assignment(caps: &Captures<'_>) -> Result<Node> {
    let target = match Token::parse(&caps["variable"]) {
        Token::Path(segments) => segments,
        _ => {
            return Err(StencilError::Syntax(format!(
                "assignment target must be a variable path, got '{}'",
                &caps["variable"]
            )));
        }
    };

    Ok(Node::Assignment { target, source: operand(caps, "newValue", "filters") })
}
