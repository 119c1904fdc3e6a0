//! Directive syntax tree.
//!
//! The parser produces explicit nodes for the five directive forms plus
//! literal text; precedence and nesting come from the tree structure, not
//! from rewrite ordering. Filter suffixes are carried raw at this stage
//! and resolved into concrete calls by codegen, where the escaping policy
//! is applied.

/// A variable token as written in a directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A quoted literal, used verbatim (quotes stripped).
    Literal(String),
    /// A bare numeric literal such as `3` or `1.5`. Kept as a
    /// `serde_json::Number` so whole numbers stay integral in output.
    Number(serde_json::Number),
    /// A dotted identifier path for nested-mapping lookup.
    Path(Vec<String>),
}

impl Token {
    /// Classify a captured variable token.
    ///
    /// Quoted tokens become literals, all-digit tokens (one optional
    /// decimal point) become numbers, everything else is a lookup path.
    pub fn parse(raw: &str) -> Token {
        let bytes = raw.as_bytes();
        if bytes.len() >= 2 {
            let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
            if (first == b'\'' && last == b'\'') || (first == b'"' && last == b'"') {
                return Token::Literal(raw[1..raw.len() - 1].to_string());
            }
        }

        if !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit() || b == b'.')
            && raw.bytes().filter(|&b| b == b'.').count() <= 1
            && let Ok(n) = raw.parse::<serde_json::Number>()
        {
            return Token::Number(n);
        }

        Token::Path(raw.split('.').map(str::to_string).collect())
    }
}

/// A token plus its raw filter suffix (`|upper|trim(x)` or empty).
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub token: Token,
    pub filters: String,
}

impl Operand {
    pub fn new(token: Token, filters: Option<&str>) -> Self {
        Self { token, filters: filters.unwrap_or_default().to_string() }
    }
}

/// Comparison operator in a condition head.
///
/// Serializable because compiled programs embed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Comparator {
    Eq,
    Ge,
    Le,
    Ne,
}

impl Comparator {
    pub fn parse(raw: &str) -> Option<Comparator> {
        match raw {
            "=" => Some(Comparator::Eq),
            ">=" => Some(Comparator::Ge),
            "<=" => Some(Comparator::Le),
            "!=" => Some(Comparator::Ne),
            _ => None,
        }
    }
}

/// One `if`/`elseif` arm: its test and body. The optional trailing `else`
/// body lives on [`Node::Condition`] directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionArm {
    pub left: Operand,
    pub compare: Option<(Comparator, Operand)>,
    pub body: Vec<Node>,
}

/// A parsed template fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Raw output text, emitted verbatim.
    Literal(String),
    /// `{{ var|filters }}`
    Interpolation(Operand),
    /// `{% if %} ... {% elseif %} ... {% else %} ... {% endif %}`
    Condition { arms: Vec<ConditionArm>, otherwise: Vec<Node> },
    /// `{% for value in collection|filters %} ... {% endfor %}`
    Loop { binding: String, collection: Operand, body: Vec<Node> },
    /// `{% set target = source|filters %}`
    Assignment { target: Vec<String>, source: Operand },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_tokens_are_literals() {
        assert_eq!(Token::parse("'hello'"), Token::Literal("hello".to_string()));
        assert_eq!(Token::parse("\"a.b\""), Token::Literal("a.b".to_string()));
    }

    #[test]
    fn digit_tokens_are_numbers() {
        assert_eq!(Token::parse("3"), Token::Number(3.into()));
        // A whole-number token stays integral, not a float.
        assert!(matches!(Token::parse("3"), Token::Number(n) if n.is_i64()));
        assert_eq!(
            Token::parse("1.5"),
            Token::Number(serde_json::Number::from_f64(1.5).unwrap())
        );
    }

    #[test]
    fn dotted_tokens_are_paths() {
        assert_eq!(
            Token::parse("user.name"),
            Token::Path(vec!["user".to_string(), "name".to_string()])
        );
        // Two dots means this cannot be a number literal.
        assert_eq!(
            Token::parse("1.2.3"),
            Token::Path(vec!["1".to_string(), "2".to_string(), "3".to_string()])
        );
    }

    #[test]
    fn comparators_parse() {
        assert_eq!(Comparator::parse(">="), Some(Comparator::Ge));
        assert_eq!(Comparator::parse("=="), None);
    }
}
