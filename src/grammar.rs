//! Grammar fragment builder for directive matchers.
//!
//! Directive syntax is recognized by composing small named-capture
//! fragments (variable token, filter-chain suffix, comparator, condition
//! keyword, import target, literal keyword, tolerant whitespace) into
//! exactly one anchored matcher per directive form. One [`PatternBuilder`]
//! instance composes exactly one matcher; [`DirectiveGrammar`] holds the
//! full precompiled set so the regexes are built once per engine.
//!
//! The matchers operate on whole tags already isolated by the lexer, so
//! every finalized pattern is anchored to the full string.

use crate::error::{Result, StencilError};
use regex::Regex;

/// Variable token: a quoted literal or a dotted identifier path.
const PATTERN_VARIABLE: &str = r#"(?P<:::::>'[^']*'|"[^"]*"|[a-zA-Z0-9.]+)"#;

/// Filter-chain suffix, captured raw (`|upper|trim(x)` and the like).
///
/// Matched as whole `|name` / `|name(args)` units so the capture ends at
/// the chain boundary and a comparator following it is never split into
/// the chain.
const PATTERN_FILTERS: &str = r"(?P<:::::>(?:\|[a-zA-Z]+(?:\([^)]*\))?)+)";

/// Tolerant whitespace between tokens.
const PATTERN_WHITESPACE: &str = r"[ \t\r\n\v\f]*";

/// Comparison operators.
const PATTERN_COMPARE: &str = r"(?P<:::::>=|>=|<=|!=)";

/// Condition keyword opening a branch.
const PATTERN_CONDITION: &str = r"(?P<:::::>if|elseif)";

/// Import target: a view name made of letters, digits and slashes.
const PATTERN_VIEW: &str = r"(?P<:::::>[a-zA-Z0-9/]+)";

/// Accumulates grammar fragments into a single directive matcher.
///
/// Fragments are appended in call order; each capture fragment may be
/// required or optional independently. [`PatternBuilder::wrap`] (or
/// [`PatternBuilder::wrap_with`]) finalizes the sequence by surrounding it
/// with a delimiter pair and tolerant whitespace, after which
/// [`PatternBuilder::build`] compiles the anchored matcher.
#[derive(Debug, Default)]
pub struct PatternBuilder {
    pattern: String,
}

impl PatternBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn fragment(mut self, template: &str, name: &str, optional: bool) -> Self {
        self.pattern.push_str(&template.replace(":::::", name));
        if optional {
            self.pattern.push('?');
        }
        self
    }

    /// Capture a variable token (quoted literal or dotted path) under `name`.
    pub fn variable(self, name: &str, optional: bool) -> Self {
        self.fragment(PATTERN_VARIABLE, name, optional)
    }

    /// Capture a raw filter-chain suffix under `name`. Always optional: a
    /// bare variable is valid wherever a filtered one is.
    pub fn filters(self, name: &str) -> Self {
        self.fragment(PATTERN_FILTERS, name, true)
    }

    /// Capture a comparison operator under `name`.
    pub fn compare(self, name: &str, optional: bool) -> Self {
        self.fragment(PATTERN_COMPARE, name, optional)
    }

    /// Capture the condition keyword (`if`/`elseif`) under `name`.
    pub fn condition(self, name: &str) -> Self {
        self.fragment(PATTERN_CONDITION, name, false)
    }

    /// Capture an import target under `name`.
    pub fn view(self, name: &str) -> Self {
        self.fragment(PATTERN_VIEW, name, false)
    }

    /// Allow (but do not require) whitespace between tokens.
    pub fn whitespace(mut self) -> Self {
        self.pattern.push_str(PATTERN_WHITESPACE);
        self
    }

    /// Require a literal keyword at this position.
    pub fn put(mut self, literal: &str) -> Self {
        self.pattern.push_str(&regex::escape(literal));
        self
    }

    /// Finalize with the statement delimiter pair `{% ... %}`.
    pub fn wrap(self) -> Self {
        self.wrap_with("{%", "%}")
    }

    /// Finalize by wrapping the accumulated fragments in a delimiter pair
    /// with tolerant surrounding whitespace.
    pub fn wrap_with(mut self, start: &str, end: &str) -> Self {
        self.pattern = format!(
            "{}{}{}{}{}",
            regex::escape(start),
            PATTERN_WHITESPACE,
            self.pattern,
            PATTERN_WHITESPACE,
            regex::escape(end),
        );
        self
    }

    /// Compile the matcher, anchored to the whole tag.
    pub fn build(self) -> Result<Regex> {
        let anchored = format!("^{}$", self.pattern);
        Regex::new(&anchored)
            .map_err(|e| StencilError::Syntax(format!("invalid directive matcher: {e}")))
    }
}

/// The precompiled matcher per directive form.
///
/// Capture names follow the directive fields: `view` for import targets,
/// `condition`/`variable`/`filters`/`compare`/`comparator`/`comparatorFilters`
/// for condition heads, `value`/`variable`/`filters` for loop heads and
/// `variable`/`newValue`/`filters` for assignments.
#[derive(Debug)]
pub struct DirectiveGrammar {
    pub import: Regex,
    pub condition: Regex,
    pub else_tag: Regex,
    pub endif: Regex,
    pub loop_head: Regex,
    pub endfor: Regex,
    pub assign: Regex,
    pub interpolation: Regex,
}

impl DirectiveGrammar {
    /// Compile the full matcher set. Built once per engine.
    pub fn new() -> Result<Self> {
        Ok(Self {
            import: PatternBuilder::new()
                .put("import")
                .whitespace()
                .view("view")
                .wrap()
                .build()?,
            condition: PatternBuilder::new()
                .condition("condition")
                .whitespace()
                .variable("variable", false)
                .filters("filters")
                .whitespace()
                .compare("compare", true)
                .whitespace()
                .variable("comparator", true)
                .filters("comparatorFilters")
                .wrap()
                .build()?,
            else_tag: PatternBuilder::new().put("else").wrap().build()?,
            endif: PatternBuilder::new().put("endif").wrap().build()?,
            loop_head: PatternBuilder::new()
                .put("for ")
                .variable("value", false)
                .put(" in ")
                .variable("variable", false)
                .filters("filters")
                .wrap()
                .build()?,
            endfor: PatternBuilder::new().put("endfor").wrap().build()?,
            assign: PatternBuilder::new()
                .put("set")
                .whitespace()
                .variable("variable", false)
                .whitespace()
                .put("=")
                .whitespace()
                .variable("newValue", false)
                .filters("filters")
                .wrap()
                .build()?,
            interpolation: PatternBuilder::new()
                .variable("variable", false)
                .filters("filters")
                .wrap_with("{{", "}}")
                .build()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> DirectiveGrammar {
        DirectiveGrammar::new().unwrap()
    }

    #[test]
    fn import_captures_view_name() {
        let g = grammar();
        let caps = g.import.captures("{% import partials/header %}").unwrap();
        assert_eq!(&caps["view"], "partials/header");
    }

    #[test]
    fn import_tolerates_whitespace() {
        let g = grammar();
        assert!(g.import.is_match("{%import menu%}"));
        assert!(g.import.is_match("{%  import   menu  %}"));
        assert!(!g.import.is_match("{% import %}"));
    }

    #[test]
    fn interpolation_captures_variable_and_filters() {
        let g = grammar();
        let caps = g.interpolation.captures("{{ user.name|upper|trim }}").unwrap();
        assert_eq!(&caps["variable"], "user.name");
        assert_eq!(&caps["filters"], "|upper|trim");
    }

    #[test]
    fn interpolation_matches_quoted_literal() {
        let g = grammar();
        let caps = g.interpolation.captures(r#"{{ "hello" }}"#).unwrap();
        assert_eq!(&caps["variable"], r#""hello""#);
        assert!(caps.name("filters").is_none());
    }

    #[test]
    fn condition_with_comparator_and_operand_filters() {
        let g = grammar();
        let caps = g
            .condition
            .captures("{% if name|length >= 3 %}")
            .unwrap();
        assert_eq!(&caps["condition"], "if");
        assert_eq!(&caps["variable"], "name");
        assert_eq!(&caps["filters"], "|length");
        assert_eq!(&caps["compare"], ">=");
        assert_eq!(&caps["comparator"], "3");
        assert!(caps.name("comparatorFilters").is_none());
    }

    #[test]
    fn condition_filters_without_comparator_capture_whole_chain() {
        let g = grammar();
        let caps = g.condition.captures("{% if name|length %}").unwrap();
        assert_eq!(&caps["variable"], "name");
        assert_eq!(&caps["filters"], "|length");
        assert!(caps.name("compare").is_none());
        assert!(caps.name("comparator").is_none());

        let caps = g.condition.captures("{% elseif name|trim('x')|length %}").unwrap();
        assert_eq!(&caps["filters"], "|trim('x')|length");
        assert!(caps.name("comparator").is_none());
    }

    #[test]
    fn condition_without_comparator() {
        let g = grammar();
        let caps = g.condition.captures("{% if user.active %}").unwrap();
        assert_eq!(&caps["variable"], "user.active");
        assert!(caps.name("compare").is_none());
        assert!(caps.name("comparator").is_none());
    }

    #[test]
    fn condition_elseif_keyword() {
        let g = grammar();
        let caps = g.condition.captures("{% elseif count != 0 %}").unwrap();
        assert_eq!(&caps["condition"], "elseif");
        assert_eq!(&caps["compare"], "!=");
    }

    #[test]
    fn loop_head_captures_binding_and_collection() {
        let g = grammar();
        let caps = g.loop_head.captures("{% for item in items|join %}").unwrap();
        assert_eq!(&caps["value"], "item");
        assert_eq!(&caps["variable"], "items");
        assert_eq!(&caps["filters"], "|join");
    }

    #[test]
    fn assign_captures_target_source_and_filters() {
        let g = grammar();
        let caps = g.assign.captures("{% set title = page.title|upper %}").unwrap();
        assert_eq!(&caps["variable"], "title");
        assert_eq!(&caps["newValue"], "page.title");
        assert_eq!(&caps["filters"], "|upper");
    }

    #[test]
    fn block_terminators_match() {
        let g = grammar();
        assert!(g.else_tag.is_match("{% else %}"));
        assert!(g.endif.is_match("{%endif%}"));
        assert!(g.endfor.is_match("{% endfor %}"));
    }

    #[test]
    fn matchers_are_anchored() {
        let g = grammar();
        assert!(!g.endif.is_match("text {% endif %}"));
        assert!(!g.interpolation.is_match("{{ a }} trailing"));
    }
}
