//! Include expansion: the first compilation stage.
//!
//! `{% import <name> %}` splices the partial's raw text verbatim into the
//! surrounding source. Spliced text may itself contain import directives,
//! so the pass re-scans and repeats until none remain; parsing only begins
//! on include-free text. A partial that imports itself (directly or
//! transitively) is an implementation-fatal condition and is not specially
//! detected — the fixpoint loop simply never terminates.

use super::parser::{Segment, lex};
use crate::error::{Result, StencilError};
use crate::grammar::DirectiveGrammar;
use crate::resolver::ViewResolver;
use std::fs;

/// Expand all import directives, transitively, and return the include-free
/// text. A missing partial aborts with NotFound before anything is cached.
pub(crate) fn expand(
    source: String,
    grammar: &DirectiveGrammar,
    resolver: &dyn ViewResolver,
) -> Result<String> {
    let mut content = source;

    loop {
        let mut spliced = false;
        let mut out = String::with_capacity(content.len());

        for segment in lex(&content) {
            match &segment {
                Segment::Statement(raw) => {
                    if let Some(caps) = grammar.import.captures(raw) {
                        let path = resolver.source_path(&caps["view"]);
                        if !path.exists() {
                            return Err(StencilError::NotFound(path.display().to_string()));
                        }
                        let partial =
                            fs::read_to_string(&path).map_err(|e| StencilError::io(&path, e))?;
                        out.push_str(&partial);
                        spliced = true;
                    } else {
                        out.push_str(raw);
                    }
                }
                other => out.push_str(other.raw()),
            }
        }

        content = out;
        if !spliced {
            return Ok(content);
        }
    }
}
