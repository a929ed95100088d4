//! The session environment.
//!
//! An [`Environment`] owns everything one styling session accumulates: the
//! symbol table, the theme registry and the set of loaded packages. Files are
//! applied on top of each other; a failing declaration aborts its file but
//! keeps whatever earlier declarations already bound.

use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::engine::error::StyleError;
use crate::engine::expander::{self, Effect, Expander, Expansion};
use crate::engine::packages::{ImageHandle, PackageBundle, PackageLoader, PackageStore};
use crate::engine::symbols::SymbolTable;
use crate::engine::themes::ThemeRegistry;
use crate::engine::value::{Binding, MacroDef, PatternRef, Value};
use crate::markup::Tree;
use crate::style::{Declaration, StyleFile};

pub struct Environment {
    config: EngineConfig,
    symbols: SymbolTable,
    themes: ThemeRegistry,
    packages: PackageLoader,
    store: Box<dyn PackageStore>,
}

impl Environment {
    /// Create a session with the default configuration.
    pub fn new(store: impl PackageStore + 'static) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: impl PackageStore + 'static, config: EngineConfig) -> Self {
        Self {
            symbols: SymbolTable::with_builtins(&config.builtins),
            themes: ThemeRegistry::new(),
            packages: PackageLoader::new(),
            store: Box::new(store),
            config,
        }
    }

    // ── Symbols and macros ───────────────────────────────────────────

    pub fn assign(&mut self, name: impl Into<String>, binding: Binding) {
        self.symbols.assign(name, binding);
    }

    /// Resolve `name` to a literal or macro, following aliases.
    pub fn lookup(&self, name: &str) -> Result<&Binding, StyleError> {
        self.symbols.lookup(name)
    }

    pub fn define(&mut self, name: &str, params: Vec<String>, body: Tree) -> Result<(), StyleError> {
        expander::define(&mut self.symbols, name, params, body)
    }

    fn expander(&mut self) -> Expander<'_> {
        Expander::new(&mut self.symbols, self.config.max_expansion_depth)
            .with_max_nesting(self.config.max_nesting_depth)
    }

    /// Expand the macro bound to `name` and apply the assignments it made.
    pub fn expand(&mut self, name: &str, args: &[Tree]) -> Result<Expansion, StyleError> {
        let expansion = self.expander().expand(name, args)?;
        self.apply_effects(&expansion.effects);
        Ok(expansion)
    }

    /// Evaluate markup and apply the assignments it made.
    pub fn evaluate(&mut self, tree: &Tree) -> Result<Expansion, StyleError> {
        let expansion = self.expander().evaluate(tree)?;
        self.apply_effects(&expansion.effects);
        Ok(expansion)
    }

    /// Apply effects in the order they were produced.
    pub fn apply_effects(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::Assign { name, binding } => {
                    self.symbols.assign(name.as_str(), binding.clone());
                }
            }
        }
    }

    // ── Packages ─────────────────────────────────────────────────────

    /// Load package `name` and its dependencies, once per session.
    pub fn use_package(&mut self, name: &str) -> Result<(), StyleError> {
        if self.packages.is_loaded(name) {
            trace!(package = name, "already loaded");
            return Ok(());
        }
        self.packages.begin(name)?;
        let result = match self.store.resolve_package(name) {
            Ok(bundle) => self.load_bundle(&bundle),
            Err(e) => Err(e),
        };
        self.packages.finish(name, result.is_ok());
        result
    }

    fn load_bundle(&mut self, bundle: &PackageBundle) -> Result<(), StyleError> {
        for dep in &bundle.uses {
            self.use_package(dep)?;
        }
        self.apply_all(&bundle.declarations)?;
        debug!(
            package = %bundle.name,
            version = bundle.version.as_deref().unwrap_or("-"),
            declarations = bundle.declarations.len(),
            "loaded package"
        );
        Ok(())
    }

    /// Packages loaded so far, in load order.
    pub fn loaded_packages(&self) -> &[String] {
        self.packages.loaded()
    }

    // ── Themes ───────────────────────────────────────────────────────

    pub fn new_theme(&mut self, name: &str, members: &[String]) {
        self.themes.new_theme(name, members.iter().cloned());
    }

    pub fn copy_theme(&mut self, target: &str, source: &str) -> Result<usize, StyleError> {
        self.themes.copy_theme(&mut self.symbols, target, source)
    }

    pub fn select_theme(&mut self, family: &str, theme: &str) -> Result<(), StyleError> {
        self.themes.select_theme(&mut self.symbols, family, theme)
    }

    // ── Declarations and files ───────────────────────────────────────

    /// Apply one file-level declaration.
    pub fn apply(&mut self, declaration: &Declaration) -> Result<(), StyleError> {
        match declaration {
            Declaration::UsePackage(name) => self.use_package(name),
            Declaration::Assign { name, value } => {
                let expansion = self.evaluate(value)?;
                let binding = Binding::from_tree(&expansion.value)?;
                self.symbols.assign(name.as_str(), binding);
                Ok(())
            }
            Declaration::DefineMacro { name, params, body } => {
                self.define(name, params.clone(), body.clone())
            }
            Declaration::CopyTheme { target, source } => self.copy_theme(target, source).map(drop),
            Declaration::SelectTheme { family, theme } => self.select_theme(family, theme),
            Declaration::NewTheme { name, members } => {
                self.new_theme(name, members);
                Ok(())
            }
            Declaration::Content(tree) => {
                if self.config.expand_content {
                    self.evaluate(tree)?;
                } else {
                    debug!(content = %tree, "skipped content paragraph");
                }
                Ok(())
            }
        }
    }

    /// Apply declarations in order, stopping at the first failure.
    pub fn apply_all(&mut self, declarations: &[Declaration]) -> Result<(), StyleError> {
        for declaration in declarations {
            self.apply(declaration)?;
        }
        Ok(())
    }

    /// Parse and apply a style file.
    pub fn load_source(&mut self, text: &str) -> Result<(), StyleError> {
        let file = StyleFile::parse(text)?;
        self.load_document(&file)
    }

    /// Apply a parsed style file: its styles, then its initial values, then its body.
    pub fn load_document(&mut self, file: &StyleFile) -> Result<(), StyleError> {
        for style in &file.styles {
            self.use_package(style)?;
        }
        for (name, value) in &file.initial {
            self.symbols.assign(name.as_str(), Binding::from_tree(value)?);
        }
        self.apply_all(&file.declarations()?)?;
        debug!(styles = ?file.styles, version = ?file.version, "loaded document");
        Ok(())
    }

    // ── Rendering queries ────────────────────────────────────────────

    /// The resolved value of `name`. Macros are returned as their literal.
    pub fn symbol_value(&self, name: &str) -> Result<Value, StyleError> {
        match self.symbols.lookup(name)? {
            Binding::Literal(value) => Ok(value.clone()),
            Binding::Macro(def) => Ok(Value::Tree(def.to_tree())),
            Binding::Alias(target) => Err(StyleError::UnboundSymbol(target.clone())),
        }
    }

    pub fn macro_definition(&self, name: &str) -> Result<&MacroDef, StyleError> {
        self.symbols
            .lookup(name)?
            .as_macro()
            .ok_or_else(|| StyleError::NotAMacro(name.to_string()))
    }

    /// [`symbol_value`](Self::symbol_value), or `fallback` when the lookup fails.
    pub fn symbol_value_or(&self, name: &str, fallback: Value) -> Value {
        match self.symbol_value(name) {
            Ok(value) => value,
            Err(e) => {
                warn!(symbol = name, error = %e, "using fallback value");
                fallback
            }
        }
    }

    /// Resolve the image of a background pattern through the store.
    pub fn resolve_pattern(&self, pattern: &PatternRef) -> Result<ImageHandle, StyleError> {
        self.store.resolve_image_asset(&pattern.image).inspect_err(|e| {
            warn!(
                image = %pattern.image,
                fallback = pattern.fallback.as_deref().unwrap_or("-"),
                error = %e,
                "pattern image unavailable"
            );
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn themes(&self) -> &ThemeRegistry {
        &self.themes
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::packages::MemoryStore;
    use crate::markup::parse_markup;
    use pretty_assertions::assert_eq;

    fn env() -> Environment {
        Environment::new(MemoryStore::new())
    }

    fn env_with(packages: &[(&str, &str)]) -> Environment {
        let mut store = MemoryStore::new();
        for (name, src) in packages {
            store.insert_source(name, src).unwrap();
        }
        Environment::new(store)
    }

    fn pattern(image: &str) -> Binding {
        Binding::Literal(Value::Pattern(PatternRef::new(image).with_fallback("#080808")))
    }

    // ── Symbols ──────────────────────────────────────────────────────

    #[test]
    fn assign_then_lookup() {
        let mut env = env();
        for (name, v) in [("a", "1"), ("strong-color", "#f0ffb0"), ("a", "2")] {
            env.assign(name, Binding::literal(v));
            assert_eq!(env.lookup(name).unwrap(), &Binding::literal(v));
        }
    }

    #[test]
    fn builtins_come_from_config() {
        let env = env();
        assert_eq!(env.symbol_value("preamble").unwrap(), Value::Bool(false));

        let bare = Environment::with_config(MemoryStore::new(), EngineConfig::new().without_builtins());
        assert_eq!(
            bare.symbol_value("preamble").unwrap_err(),
            StyleError::UnboundSymbol("preamble".into())
        );
    }

    #[test]
    fn macro_queries() {
        let mut env = env();
        env.define("title-color", vec![], Tree::atom("white")).unwrap();
        assert_eq!(env.macro_definition("title-color").unwrap().arity(), 0);
        assert!(matches!(env.symbol_value("title-color"), Ok(Value::Tree(t)) if t.is("macro")));
        assert_eq!(
            env.macro_definition("preamble").unwrap_err(),
            StyleError::NotAMacro("preamble".into())
        );
    }

    #[test]
    fn fallback_on_unbound_symbol() {
        let env = env();
        assert_eq!(
            env.symbol_value_or("granite-title-color", Value::text("white")),
            Value::text("white")
        );
    }

    #[test]
    fn patterns_resolve_through_store() {
        let mut store = MemoryStore::new();
        store.insert_asset("granite-xdark.png");
        let env = Environment::new(store);
        assert!(env.resolve_pattern(&PatternRef::new("granite-xdark.png")).is_ok());
        assert_eq!(
            env.resolve_pattern(&PatternRef::new("granite-medium.png")).unwrap_err(),
            StyleError::AssetNotFound("granite-medium.png".into())
        );
        assert!(!env.symbols().is_bound("granite-medium.png"));
    }

    // ── Expansion ────────────────────────────────────────────────────

    #[test]
    fn arity_mismatch() {
        let mut env = env();
        env.define("pair", vec!["x".into(), "y".into()], Tree::atom("")).unwrap();
        assert_eq!(
            env.expand("pair", &[Tree::atom("a")]).unwrap_err(),
            StyleError::ArityMismatch {
                name: "pair".into(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn expansion_effects_are_applied() {
        let mut env = env();
        env.load_source("<assign|src-style-file|<macro|x|y|<assign|<merge|<arg|x>|-style>|<arg|y>>>>")
            .unwrap();
        let out = env.expand("src-style-file", &[Tree::atom("source"), Tree::atom("1.0")]).unwrap();
        assert_eq!(out.effects.len(), 1);
        assert_eq!(env.symbol_value("source-style").unwrap(), Value::from_atom("1.0"));
    }

    #[test]
    fn runaway_recursion_is_bounded() {
        let mut env = Environment::with_config(
            MemoryStore::new(),
            EngineConfig::new().with_max_expansion_depth(16),
        );
        env.load_source("<assign|loop|<macro|<loop>>>").unwrap();
        assert_eq!(
            env.expand("loop", &[]).unwrap_err(),
            StyleError::ExpansionDepthExceeded {
                name: "loop".into(),
                limit: 16
            }
        );
    }

    #[test]
    fn content_is_evaluated_for_effects() {
        let src = "<assign|mark|<macro|x|<assign|marked|<arg|x>>>>\n\n<mark|yes>";
        let mut env = env();
        env.load_source(src).unwrap();
        assert_eq!(env.symbol_value("marked").unwrap(), Value::text("yes"));

        let mut quiet = Environment::with_config(
            MemoryStore::new(),
            EngineConfig::new().with_expand_content(false),
        );
        quiet.load_source(src).unwrap();
        assert!(!quiet.symbols().is_bound("marked"));
    }

    #[test]
    fn assigned_value_is_evaluated_first() {
        let mut env = env();
        env.load_source("<assign|stone-granite-block|<macro|x|<arg|x>>>\n\n<assign|granite-framed-block|<value|stone-granite-block>>")
            .unwrap();
        assert_eq!(env.macro_definition("granite-framed-block").unwrap().params(), &["x".to_string()]);
    }

    #[test]
    fn numbers_are_reused_as_written() {
        let mut env = env();
        env.load_source("<assign|v|1.10>\n\n<assign|w|<merge|<value|v>|-x>>").unwrap();
        let value = parse_markup("<value|v>").unwrap().remove(0);
        assert_eq!(env.evaluate(&value).unwrap().value, Tree::atom("1.10"));
        assert_eq!(env.symbol_value("w").unwrap(), Value::text("1.10-x"));
    }

    #[test]
    fn computed_assign_is_content() {
        let src = "<assign|<merge|source|-style>|1.0>";
        let mut env = env();
        env.load_source(src).unwrap();
        assert_eq!(env.symbol_value("source-style").unwrap(), Value::from_atom("1.0"));

        let mut quiet = Environment::with_config(
            MemoryStore::new(),
            EngineConfig::new().with_expand_content(false),
        );
        quiet.load_source(src).unwrap();
        assert!(!quiet.symbols().is_bound("source-style"));
    }

    // ── Themes ───────────────────────────────────────────────────────

    #[test]
    fn selected_member_used_as_tag_must_resolve() {
        let mut env = env();
        env.new_theme("granite", &["frame-color".to_string()]);
        env.select_theme("granite", "stone-granite").unwrap();
        let markup = parse_markup("<granite-frame-color>").unwrap().remove(0);
        assert_eq!(
            env.evaluate(&markup).unwrap_err(),
            StyleError::UnboundSymbol("stone-granite-frame-color".into())
        );

        env.define("stone-granite-frame-color", vec![], Tree::atom("#5a5a5a")).unwrap();
        assert_eq!(env.evaluate(&markup).unwrap().value, Tree::atom("#5a5a5a"));
    }

    #[test]
    fn copy_is_a_snapshot() {
        let mut env = env();
        env.assign("dark-bg-color", Binding::literal("#000000"));
        env.copy_theme("granite", "dark").unwrap();
        env.assign("dark-bg-color", Binding::literal("#111111"));
        assert_eq!(env.symbol_value("granite-bg-color").unwrap(), Value::Color("#000000".into()));
    }

    #[test]
    fn select_is_a_live_alias() {
        let mut env = env();
        env.assign("dark-bg-color", Binding::literal("#000000"));
        env.copy_theme("granite", "dark").unwrap();
        env.assign("stone-granite-bg-color", Binding::literal("#202020"));
        env.select_theme("granite", "stone-granite").unwrap();
        env.assign("stone-granite-bg-color", Binding::literal("#303030"));
        assert_eq!(env.symbol_value("granite-bg-color").unwrap(), Value::Color("#303030".into()));
    }

    #[test]
    fn select_then_select_again_resolves_through_last() {
        let mut env = env();
        env.assign("dark-bg-color", Binding::literal("#000000"));
        env.assign("stone-granite-bg-color", pattern("granite-medium.png"));
        env.assign("granite-bg-color", pattern("granite-xdark.png"));

        env.copy_theme("granite", "stone-granite").unwrap();
        env.select_theme("granite", "dark").unwrap();
        env.select_theme("granite", "stone-granite").unwrap();

        assert_eq!(env.lookup("granite-bg-color").unwrap(), &pattern("granite-medium.png"));
        env.assign("stone-granite-bg-color", Binding::literal("#202020"));
        assert_eq!(env.symbol_value("granite-bg-color").unwrap(), Value::Color("#202020".into()));
    }

    #[test]
    fn partial_theme_coverage_fails_at_lookup() {
        let mut env = env();
        env.new_theme("granite", &["bg-color".into(), "title-color".into()]);
        env.assign("dark-bg-color", Binding::literal("#000000"));
        env.select_theme("granite", "dark").unwrap();
        assert!(env.symbol_value("granite-bg-color").is_ok());
        assert_eq!(
            env.symbol_value("granite-title-color").unwrap_err(),
            StyleError::UnboundSymbol("dark-title-color".into())
        );
    }

    // ── Packages ─────────────────────────────────────────────────────

    const DARK: &str = "<assign|dark-bg-color|#000000>\n\n<assign|dark-strong-color|#ffffff>";
    const DECO: &str = "<assign|stone-granite-bg-color|#202020>\n\n<assign|stone-granite-block|<macro|x|<arg|x>>>";

    #[test]
    fn use_package_is_idempotent() {
        let mut env = env_with(&[("dark-combo", DARK)]);
        env.use_package("dark-combo").unwrap();
        let once = env.symbols().clone();
        env.use_package("dark-combo").unwrap();
        assert_eq!(env.symbols(), &once);
        assert_eq!(env.loaded_packages(), &["dark-combo".to_string()]);
    }

    #[test]
    fn disjoint_packages_merge() {
        let mut env = env_with(&[("dark-combo", DARK), ("stone-granite-deco", DECO)]);
        env.use_package("dark-combo").unwrap();
        let after_first = env.symbols().len();
        env.use_package("stone-granite-deco").unwrap();
        assert_eq!(env.symbols().len(), after_first + 2);
        assert_eq!(env.symbol_value("dark-bg-color").unwrap(), Value::Color("#000000".into()));
        assert_eq!(
            env.symbol_value("stone-granite-bg-color").unwrap(),
            Value::Color("#202020".into())
        );
    }

    #[test]
    fn dependencies_load_first() {
        let mut env = env_with(&[
            ("dark-combo", DARK),
            ("granite", "<use-package|dark-combo>\n\n<copy-theme|granite|dark>"),
        ]);
        env.use_package("granite").unwrap();
        assert_eq!(
            env.loaded_packages(),
            &["dark-combo".to_string(), "granite".to_string()]
        );
        assert!(env.symbols().is_bound("granite-strong-color"));
    }

    #[test]
    fn missing_package() {
        let mut env = env();
        assert_eq!(
            env.use_package("std-markup").unwrap_err(),
            StyleError::PackageNotFound("std-markup".into())
        );
        assert!(env.loaded_packages().is_empty());
    }

    #[test]
    fn cyclic_packages() {
        let mut env = env_with(&[("a", "<use-package|b>"), ("b", "<use-package|a>")]);
        assert_eq!(
            env.use_package("a").unwrap_err(),
            StyleError::CyclicDependency {
                name: "a".into(),
                chain: vec!["a".into(), "b".into(), "a".into()],
            }
        );
        assert!(env.loaded_packages().is_empty());
    }

    #[test]
    fn failed_package_keeps_applied_bindings() {
        let mut env = env_with(&[("broken", "<assign|kept|1>\n\n<select-theme|nowhere|dark>")]);
        assert_eq!(
            env.use_package("broken").unwrap_err(),
            StyleError::UnknownFamily("nowhere".into())
        );
        assert!(env.symbols().is_bound("kept"));
        assert!(env.loaded_packages().is_empty());
    }

    #[test]
    fn document_applies_style_then_initial_then_body() {
        let mut env = env_with(&[("source", "<assign|par-first|0fn>\n\n<assign|sfactor|4>")]);
        env.load_source(
            "<style|source>\n\n<\\body>\n  <assign|par-par-sep|<value|sfactor>>\n</body>\n\n<\\initial>\n  <\\collection>\n    <associate|sfactor|7>\n  </collection>\n</initial>",
        )
        .unwrap();
        assert_eq!(env.symbol_value("sfactor").unwrap(), Value::from_atom("7"));
        assert_eq!(env.symbol_value("par-par-sep").unwrap(), Value::from_atom("7"));
        assert_eq!(env.loaded_packages(), &["source".to_string()]);
    }
}
