//! Symbol table: name → binding, with scoped override.
//!
//! The bottom scope holds session-wide bindings. `with` pushes a scope for the
//! duration of its body; lookups search innermost first, then the bottom
//! scope, then the configured built-ins.

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use crate::engine::error::StyleError;
use crate::engine::value::{Binding, Value};

/// Concatenate two symbol name fragments, e.g. `source` + `-style`.
pub fn merge_name(a: &str, b: &str) -> String {
    let mut name = String::with_capacity(a.len() + b.len());
    name.push_str(a);
    name.push_str(b);
    name
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, Binding>>,
    builtins: HashMap<String, Binding>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Create an empty table with no built-ins.
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
            builtins: HashMap::new(),
        }
    }

    /// Create a table whose lookups fall back to `builtins`.
    pub fn with_builtins(builtins: &HashMap<String, Value>) -> Self {
        Self {
            scopes: vec![HashMap::new()],
            builtins: builtins
                .iter()
                .map(|(k, v)| (k.clone(), Binding::Literal(v.clone())))
                .collect(),
        }
    }

    /// Replace the binding of `name` in the innermost scope.
    pub fn assign(&mut self, name: impl Into<String>, binding: Binding) {
        let name = name.into();
        trace!(symbol = %name, binding = ?binding, "assign");
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, binding);
        }
    }

    /// The raw binding of `name`, without following aliases.
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.builtins.get(name))
    }

    /// Resolve `name` to a literal or macro, following aliases.
    pub fn lookup(&self, name: &str) -> Result<&Binding, StyleError> {
        let mut path: Vec<String> = Vec::new();
        let mut current = name.to_string();

        loop {
            if path.contains(&current) {
                path.push(current);
                return Err(StyleError::CyclicAlias {
                    name: name.to_string(),
                    path,
                });
            }
            let binding = self
                .binding(&current)
                .ok_or_else(|| StyleError::UnboundSymbol(current.clone()))?;
            match binding {
                Binding::Alias(target) => {
                    path.push(current);
                    current = target.clone();
                }
                terminal => return Ok(terminal),
            }
        }
    }

    /// Returns `true` if `name` has a binding (aliases are not followed).
    pub fn is_bound(&self, name: &str) -> bool {
        self.binding(name).is_some()
    }

    /// All assigned names starting with `prefix`, sorted. Built-ins are excluded.
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .scopes
            .iter()
            .flat_map(|scope| scope.keys())
            .filter(|k| k.starts_with(prefix))
            .collect();
        names.into_iter().cloned().collect()
    }

    /// Open a scope for temporary overrides.
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Close the innermost scope. The bottom scope is never removed.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Number of assigned names across all scopes.
    pub fn len(&self) -> usize {
        self.scopes.iter().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
