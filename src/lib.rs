//! Stencil: a small template engine with a compile-once artifact cache.
//!
//! Templates mix literal text with `{{ ... }}` interpolations and
//! `{% ... %}` statements (conditions, loops, assignments, imports).
//! A view compiles through a fixed pipeline — include expansion, parsing
//! into a node tree, lowering into executable ops — and the result is
//! cached content-addressed by the source file's path and mtime, so an
//! unchanged view never recompiles. Execution interprets the compiled
//! program against a caller scope of JSON values, with every filter
//! resolved through an injected registry.
//!
//! ```no_run
//! use stencil::{DirectoryResolver, Engine, Scope};
//! use serde_json::json;
//!
//! # fn main() -> stencil::Result<()> {
//! let mut engine = Engine::new(DirectoryResolver::new("views"), "cache")?;
//! let scope: Scope = json!({"name": "world"}).as_object().cloned().unwrap();
//! let html = engine.render("hello", &scope)?;
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod cache;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod exec;
pub mod filters;
pub mod grammar;
pub mod program;
pub mod resolver;
pub mod scope;

pub use engine::Engine;
pub use error::{Result, StencilError};
pub use filters::{FilterFn, FilterRegistry};
pub use program::Program;
pub use resolver::{DirectoryResolver, ViewResolver};
pub use scope::Scope;

pub use serde_json::Value;
