//! Macro expansion.
//!
//! Evaluation is call-by-value: the arguments of a macro invocation are
//! evaluated in the caller's context before they are bound to the macro's
//! parameters. Each invocation gets a fresh argument frame, so parameters never
//! leak into nested calls.
//!
//! A macro body may contain `<assign|...>`. Those assignments are not applied
//! while expanding; they are collected as [`Effect`]s and returned next to the
//! expanded value so the caller applies them explicitly.
//!
//! Primitive tags:
//!
//! | tag        | meaning                                              |
//! |------------|------------------------------------------------------|
//! | `arg`      | value bound to a parameter of the current macro      |
//! | `value`    | resolved binding of a symbol                         |
//! | `merge`    | concatenation of its evaluated arguments             |
//! | `macro`    | macro literal, not evaluated                         |
//! | `quote`    | its argument, not evaluated                          |
//! | `assign`   | records an assignment effect, evaluates to nothing   |
//! | `with`     | evaluates its body with symbols temporarily bound    |
//!
//! Any other tag bound to a macro is invoked. Unbound tags and tags bound to
//! literals are markup for the renderer and are kept with evaluated children.
//! A tag bound to an alias that does not resolve is an error.

use std::collections::HashMap;

use tracing::trace;

use crate::engine::error::StyleError;
use crate::engine::symbols::{merge_name, SymbolTable};
use crate::engine::value::{Binding, MacroDef, MACRO};
use crate::markup::model::{CONCAT, DOCUMENT};
use crate::markup::Tree;

/// A state change requested by an expanded body.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Assign { name: String, binding: Binding },
}

/// Result of an expansion: the value plus the effects to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub value: Tree,
    pub effects: Vec<Effect>,
}

/// Store a macro under `name`.
pub fn define(
    table: &mut SymbolTable,
    name: &str,
    params: Vec<String>,
    body: Tree,
) -> Result<(), StyleError> {
    let def = MacroDef::new(params, body)?;
    table.assign(name, Binding::Macro(def));
    Ok(())
}

type Frame = HashMap<String, Tree>;

const DEFAULT_MAX_NESTING: usize = 256;

/// Evaluates markup against a symbol table.
///
/// The table is only mutated through `with` scopes, which are removed again
/// before evaluation returns.
pub struct Expander<'t> {
    table: &'t mut SymbolTable,
    max_depth: usize,
    depth: usize,
    max_nesting: usize,
    nesting: usize,
    effects: Vec<Effect>,
}

impl<'t> Expander<'t> {
    /// Create an expander allowing `max_depth` nested macro invocations.
    pub fn new(table: &'t mut SymbolTable, max_depth: usize) -> Self {
        Self {
            table,
            max_depth,
            depth: 0,
            max_nesting: DEFAULT_MAX_NESTING,
            nesting: 0,
            effects: Vec::new(),
        }
    }

    /// Set how deeply tags may nest while evaluating (builder).
    pub fn with_max_nesting(mut self, limit: usize) -> Self {
        self.max_nesting = limit;
        self
    }

    /// Expand the macro bound to `name` with the given actual arguments.
    pub fn expand(mut self, name: &str, args: &[Tree]) -> Result<Expansion, StyleError> {
        let def = self.macro_named(name)?;
        let empty = Frame::new();
        let values = args
            .iter()
            .map(|a| self.eval(a, &empty))
            .collect::<Result<Vec<_>, _>>()?;
        let value = self.invoke(name, &def, values)?;
        Ok(Expansion {
            value,
            effects: self.effects,
        })
    }

    /// Evaluate free-standing markup (no enclosing macro).
    pub fn evaluate(mut self, tree: &Tree) -> Result<Expansion, StyleError> {
        let value = self.eval(tree, &Frame::new())?;
        Ok(Expansion {
            value,
            effects: self.effects,
        })
    }

    fn macro_named(&self, name: &str) -> Result<MacroDef, StyleError> {
        match self.table.lookup(name)? {
            Binding::Macro(def) => Ok(def.clone()),
            _ => Err(StyleError::NotAMacro(name.to_string())),
        }
    }

    fn invoke(&mut self, name: &str, def: &MacroDef, values: Vec<Tree>) -> Result<Tree, StyleError> {
        if values.len() != def.arity() {
            return Err(StyleError::ArityMismatch {
                name: name.to_string(),
                expected: def.arity(),
                found: values.len(),
            });
        }
        if self.depth >= self.max_depth {
            return Err(StyleError::ExpansionDepthExceeded {
                name: name.to_string(),
                limit: self.max_depth,
            });
        }

        trace!(symbol = name, depth = self.depth, "expand");
        let frame: Frame = def.params().iter().cloned().zip(values).collect();
        self.depth += 1;
        let result = self.eval(def.body(), &frame);
        self.depth -= 1;
        result
    }

    fn eval(&mut self, tree: &Tree, frame: &Frame) -> Result<Tree, StyleError> {
        let (tag, children) = match tree {
            Tree::Atom(_) => return Ok(tree.clone()),
            Tree::Compound { tag, children } => (tag.as_str(), children.as_slice()),
        };
        if self.nesting >= self.max_nesting {
            return Err(StyleError::NestingTooDeep {
                tag: tag.to_string(),
                limit: self.max_nesting,
            });
        }

        self.nesting += 1;
        let result = self.eval_compound(tree, tag, children, frame);
        self.nesting -= 1;
        result
    }

    fn eval_compound(
        &mut self,
        tree: &Tree,
        tag: &str,
        children: &[Tree],
        frame: &Frame,
    ) -> Result<Tree, StyleError> {
        match tag {
            "arg" => {
                let name = self.eval_name(tag, children.first(), frame)?;
                frame
                    .get(&name)
                    .cloned()
                    .ok_or(StyleError::UnboundArgument(name))
            }
            "value" => {
                let name = self.eval_name(tag, children.first(), frame)?;
                Ok(self.table.lookup(&name)?.to_tree())
            }
            "merge" => {
                let mut merged = String::new();
                for child in children {
                    let v = self.eval(child, frame)?;
                    let text = v
                        .to_text()
                        .ok_or_else(|| StyleError::invalid(tag, format!("cannot merge {v}")))?;
                    merged = merge_name(&merged, &text);
                }
                Ok(Tree::atom(merged))
            }
            MACRO => Ok(tree.clone()),
            "quote" => Ok(children.first().cloned().unwrap_or_else(|| Tree::atom(""))),
            "assign" => {
                let [name, value] = children else {
                    return Err(StyleError::invalid(tag, "expected a name and a value"));
                };
                let name = self.eval_name(tag, Some(name), frame)?;
                let value = self.eval(value, frame)?;
                let binding = Binding::from_tree(&value)?;
                self.effects.push(Effect::Assign { name, binding });
                Ok(Tree::atom(""))
            }
            "with" => self.eval_with(children, frame),
            CONCAT => {
                let items = self.eval_all(children, frame)?;
                Ok(Tree::concat(items))
            }
            DOCUMENT => {
                let items = self.eval_all(children, frame)?;
                Ok(Tree::document(items))
            }
            _ => {
                let def = match self.table.binding(tag) {
                    None => None,
                    Some(_) => match self.table.lookup(tag)? {
                        Binding::Macro(def) => Some(def.clone()),
                        _ => None,
                    },
                };
                let values = self.eval_all(children, frame)?;
                match def {
                    Some(def) => self.invoke(tag, &def, values),
                    None => Ok(Tree::compound(tag, values)),
                }
            }
        }
    }

    fn eval_all(&mut self, children: &[Tree], frame: &Frame) -> Result<Vec<Tree>, StyleError> {
        children.iter().map(|c| self.eval(c, frame)).collect()
    }

    fn eval_name(&mut self, tag: &str, tree: Option<&Tree>, frame: &Frame) -> Result<String, StyleError> {
        let tree = tree.ok_or_else(|| StyleError::invalid(tag, "missing name"))?;
        let v = self.eval(tree, frame)?;
        v.to_text()
            .ok_or_else(|| StyleError::invalid(tag, format!("not a name: {v}")))
    }

    /// `<with|var|val|...|body>`: bind each `var` in a fresh scope for the body.
    fn eval_with(&mut self, children: &[Tree], frame: &Frame) -> Result<Tree, StyleError> {
        let Some((body, pairs)) = children.split_last() else {
            return Err(StyleError::invalid("with", "missing body"));
        };
        if pairs.len() % 2 != 0 {
            return Err(StyleError::invalid("with", "variables and values must come in pairs"));
        }

        let mut evaluated = Vec::with_capacity(children.len());
        let mut bindings = Vec::with_capacity(pairs.len() / 2);
        for pair in pairs.chunks(2) {
            let name = self.eval_name("with", pair.first(), frame)?;
            let value = self.eval(&pair[1], frame)?;
            bindings.push((name.clone(), Binding::from_tree(&value)?));
            evaluated.push(Tree::atom(name));
            evaluated.push(value);
        }

        self.table.push_scope();
        for (name, binding) in bindings {
            self.table.assign(name, binding);
        }
        let result = self.eval(body, frame);
        self.table.pop_scope();

        evaluated.push(result?);
        Ok(Tree::compound("with", evaluated))
    }
}
