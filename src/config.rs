//! Engine configuration.

use std::collections::HashMap;

use crate::engine::value::Value;

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Configuration for an [`Environment`](crate::engine::Environment).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum nesting of macro invocations before expansion fails.
    pub max_expansion_depth: usize,
    /// Maximum nesting of tags during one evaluation, macro bodies included.
    pub max_nesting_depth: usize,
    /// Evaluate top-level content paragraphs for the assignments they perform.
    ///
    /// Turning this off also skips `<assign|...>` with a computed name, since
    /// those are content paragraphs too.
    pub expand_content: bool,
    /// Symbols every session can look up without assigning them first.
    pub builtins: HashMap<String, Value>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let builtins = [
            ("color", "black"),
            ("bg-color", "white"),
            ("font-family", "rm"),
            ("font-size", "1"),
            ("page-type", "a4"),
            ("par-first", "1.5fn"),
            ("par-par-sep", "0.5fn"),
            ("preamble", "false"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::from_atom(v)))
        .collect();

        Self {
            max_expansion_depth: 128,
            max_nesting_depth: 256,
            expand_content: true,
            builtins,
        }
    }
}

impl EngineConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expansion depth limit (builder).
    pub fn with_max_expansion_depth(mut self, depth: usize) -> Self {
        self.max_expansion_depth = depth;
        self
    }

    /// Set the tag nesting limit (builder).
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Turn evaluation of content paragraphs on or off (builder).
    pub fn with_expand_content(mut self, expand: bool) -> Self {
        self.expand_content = expand;
        self
    }

    /// Add or replace a built-in symbol (builder).
    pub fn with_builtin(mut self, name: impl Into<String>, value: Value) -> Self {
        self.builtins.insert(name.into(), value);
        self
    }

    /// Drop all built-in symbols (builder).
    pub fn without_builtins(mut self) -> Self {
        self.builtins.clear();
        self
    }
}
