//! The engine: the crate's front door.
//!
//! An engine owns the pieces a render needs — a view resolver, a filter
//! registry, the compiled directive grammar and the artifact cache — and
//! wires them into the resolve / key / compile-or-reuse / execute sequence.
//! Rendering the same unchanged view twice compiles once; the second render
//! reuses the shared compiled program.

use crate::cache::{ArtifactCache, key_for};
use crate::compiler::Compiler;
use crate::error::{Result, StencilError};
use crate::exec;
use crate::filters::{FilterFn, FilterRegistry};
use crate::grammar::DirectiveGrammar;
use crate::program::Program;
use crate::resolver::ViewResolver;
use crate::scope::Scope;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Template engine with a content-addressed compile cache.
pub struct Engine {
    resolver: Box<dyn ViewResolver>,
    registry: FilterRegistry,
    grammar: DirectiveGrammar,
    cache: ArtifactCache,
    escape_html: bool,
}

impl Engine {
    /// Build an engine over `resolver`, caching compiled artifacts under
    /// `cache_dir`. HTML escaping starts enabled.
    pub fn new(resolver: impl ViewResolver + 'static, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            resolver: Box::new(resolver),
            registry: FilterRegistry::with_builtins(),
            grammar: DirectiveGrammar::new()?,
            cache: ArtifactCache::new(cache_dir),
            escape_html: true,
        })
    }

    /// Toggle the implicit escape filter appended to every chain at
    /// compile time. Artifacts compiled under one policy keep it; the
    /// policy is baked in at codegen, not consulted at execution.
    pub fn escape_html(mut self, enabled: bool) -> Self {
        self.escape_html = enabled;
        self
    }

    /// Register a caller-supplied filter, replacing any builtin of the
    /// same name.
    pub fn register_filter(&mut self, name: &str, filter: FilterFn) {
        self.registry.register(name, filter);
    }

    /// Compile `view` if no artifact exists for its current content key,
    /// otherwise return the cached program.
    pub fn compile(&mut self, view: &str) -> Result<Arc<Program>> {
        let path = self.resolver.source_path(view);
        if !path.exists() {
            return Err(StencilError::NotFound(path.display().to_string()));
        }

        let key = key_for(&path)?;
        if let Some(program) = self.cache.get(&key)? {
            return Ok(program);
        }

        let source = fs::read_to_string(&path).map_err(|e| StencilError::io(&path, e))?;
        let compiler = Compiler {
            grammar: &self.grammar,
            resolver: self.resolver.as_ref(),
            escape_html: self.escape_html,
        };
        let program = compiler.compile(&source)?;

        // Only a fully successful compile reaches the cache.
        self.cache.store(&key, program)
    }

    /// Render `view` against `scope`, streaming output to `out`.
    pub fn render_to<W: Write>(&mut self, view: &str, scope: &Scope, out: &mut W) -> Result<()> {
        let program = self.compile(view)?;
        exec::run(&program, scope, &self.registry, out)
    }

    /// Render `view` against `scope` into a string.
    pub fn render(&mut self, view: &str, scope: &Scope) -> Result<String> {
        let program = self.compile(view)?;
        exec::run_to_string(&program, scope, &self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DirectoryResolver;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn engine_with(views: &[(&str, &str)]) -> (TempDir, Engine) {
        let dir = TempDir::new().unwrap();
        let view_root = dir.path().join("views");
        fs::create_dir_all(&view_root).unwrap();
        for (name, content) in views {
            let path = view_root.join(format!("{name}.tpl"));
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        let engine = Engine::new(
            DirectoryResolver::new(&view_root),
            dir.path().join("cache"),
        )
        .unwrap();
        (dir, engine)
    }

    fn scope(value: Value) -> Scope {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn renders_a_view_from_disk() {
        let (_dir, mut engine) = engine_with(&[("hello", "Hello {{ name }}!")]);
        let output = engine.render("hello", &scope(json!({"name": "world"}))).unwrap();
        assert_eq!(output, "Hello world!");
    }

    #[test]
    fn missing_view_is_not_found() {
        let (_dir, mut engine) = engine_with(&[]);
        let err = engine.render("absent", &scope(json!({}))).unwrap_err();
        assert!(matches!(&err, StencilError::NotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn second_compile_reuses_the_cached_program() {
        let (_dir, mut engine) = engine_with(&[("page", "{{ title }}")]);
        let first = engine.compile("page").unwrap();
        let second = engine.compile("page").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn artifact_persists_across_engine_instances() {
        let dir = TempDir::new().unwrap();
        let view_root = dir.path().join("views");
        fs::create_dir_all(&view_root).unwrap();
        fs::write(view_root.join("page.tpl"), "{{ title }}").unwrap();
        let cache_dir = dir.path().join("cache");

        let mut engine = Engine::new(DirectoryResolver::new(&view_root), &cache_dir).unwrap();
        engine.compile("page").unwrap();
        drop(engine);

        let entries: Vec<_> = fs::read_dir(&cache_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);

        let mut reopened = Engine::new(DirectoryResolver::new(&view_root), &cache_dir).unwrap();
        let output = reopened.render("page", &scope(json!({"title": "t"}))).unwrap();
        assert_eq!(output, "t");
        // Still exactly one artifact; the reopened engine reused it.
        assert_eq!(fs::read_dir(&cache_dir).unwrap().count(), 1);
    }

    #[test]
    fn failed_compile_caches_nothing() {
        let (dir, mut engine) = engine_with(&[("bad", "{% if a %}unterminated")]);
        let err = engine.render("bad", &scope(json!({}))).unwrap_err();
        assert!(matches!(err, StencilError::Syntax(_)));
        assert!(!dir.path().join("cache").exists());
    }

    #[test]
    fn escaping_is_on_by_default_and_can_be_disabled() {
        let (_dir, mut engine) = engine_with(&[("page", "{{ html }}")]);
        let s = scope(json!({"html": "<b>"}));
        assert_eq!(engine.render("page", &s).unwrap(), "&lt;b&gt;");

        let (_dir2, raw_engine) = engine_with(&[("page", "{{ html }}")]);
        let mut raw_engine = raw_engine.escape_html(false);
        assert_eq!(raw_engine.render("page", &s).unwrap(), "<b>");
    }

    #[test]
    fn custom_filter_overrides_builtin() {
        fn shout(value: &Value, _args: &[Value]) -> crate::error::Result<Value> {
            Ok(Value::String(format!("{}!!", crate::scope::to_output(value))))
        }

        let (_dir, mut engine) = engine_with(&[("page", "{{ name|shout }}")]);
        engine.register_filter("shout", shout);
        assert_eq!(
            engine.render("page", &scope(json!({"name": "hi"}))).unwrap(),
            "hi!!"
        );
    }

    #[test]
    fn render_with_includes() {
        let (_dir, mut engine) = engine_with(&[
            ("layout", "<header>{% import partials/nav %}</header>"),
            ("partials/nav", "<nav>{{ section }}</nav>"),
        ]);
        let output = engine
            .render("layout", &scope(json!({"section": "docs"})))
            .unwrap();
        assert_eq!(output, "<header><nav>docs</nav></header>");
    }
}
