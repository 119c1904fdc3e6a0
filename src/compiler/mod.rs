//! The directive compiler.
//!
//! Compilation is a fixed-order pipeline, each stage fully completing
//! before the next begins:
//!
//! 1. **Includes** — `{% import %}` directives are spliced verbatim and
//!    re-scanned until none remain (`includes`).
//! 2. **Parse** — the include-free text is lexed into segments and parsed
//!    into an explicit node tree (`parser`).
//! 3. **Codegen** — the tree is lowered into the executable op form with
//!    filter chains resolved under the escaping policy (`codegen`).
//!
//! A failure at any stage aborts the whole compile; the caller caches
//! nothing and the same failure recurs on the next attempt.

mod codegen;
mod includes;
mod parser;

#[cfg(test)]
mod tests;

use crate::error::Result;
use crate::grammar::DirectiveGrammar;
use crate::program::Program;
use crate::resolver::ViewResolver;

/// One compilation run over a single view's source text.
pub struct Compiler<'a> {
    pub grammar: &'a DirectiveGrammar,
    pub resolver: &'a dyn ViewResolver,
    /// When set, every filter chain gets the implicit escape filter
    /// unless the `raw` sentinel suppresses it.
    pub escape_html: bool,
}

impl Compiler<'_> {
    /// Compile source text into an executable program.
    pub fn compile(&self, source: &str) -> Result<Program> {
        let expanded = includes::expand(source.to_string(), self.grammar, self.resolver)?;
        let nodes = parser::parse(&expanded, self.grammar)?;
        Ok(codegen::lower(&nodes, self.escape_html))
    }
}
