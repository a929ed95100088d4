//! Bindings and the values they carry.
//!
//! Atoms are classified when a literal is bound: `true`/`false` become
//! [`Value::Bool`], `#080808` a [`Value::Color`], `0.5fn` a [`Value::Length`],
//! `4` a [`Value::Number`]. `<pattern|...>` becomes a [`Value::Pattern`].
//! Anything else is kept as text or markup.

use std::collections::HashSet;
use std::fmt;

use crate::engine::error::StyleError;
use crate::markup::Tree;

/// Tag of macro literals.
pub const MACRO: &str = "macro";

/// Tag of background pattern literals.
pub const PATTERN: &str = "pattern";

/// A number as written, e.g. `4` or `1.10`.
///
/// The source text is kept so that writing the value back reproduces it.
#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    value: f64,
    text: String,
}

impl Number {
    /// Parse a finite number starting with a digit, `-` or `.`.
    pub fn parse(s: &str) -> Option<Self> {
        if !s.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') {
            return None;
        }
        let value: f64 = s.parse().ok()?;
        value.is_finite().then(|| Number {
            value,
            text: s.to_string(),
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number {
            value,
            text: value.to_string(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A length with its unit, e.g. `1.5fn` or `30mm`.
#[derive(Debug, Clone, PartialEq)]
pub struct Length {
    magnitude: Number,
    unit: String,
}

impl Length {
    pub fn new(magnitude: f64, unit: impl Into<String>) -> Self {
        Length {
            magnitude: Number::from(magnitude),
            unit: unit.into(),
        }
    }

    /// Parse `<number><unit>` where the unit is alphabetic.
    pub fn parse(s: &str) -> Option<Self> {
        let unit_start = s.find(|c: char| c.is_ascii_alphabetic())?;
        let (num, unit) = s.split_at(unit_start);
        if num.is_empty() || !unit.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        let magnitude: f64 = num.parse().ok()?;
        Some(Length {
            magnitude: Number {
                value: magnitude,
                text: num.to_string(),
            },
            unit: unit.to_string(),
        })
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude.value()
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit)
    }
}

/// Reference to a background image tiled behind content.
///
/// The image is resolved by the storage collaborator; `fallback` is the flat
/// color used when it cannot be loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRef {
    pub image: String,
    pub width: Option<String>,
    pub height: Option<String>,
    pub fallback: Option<String>,
}

impl PatternRef {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            width: None,
            height: None,
            fallback: None,
        }
    }

    /// Set the tile size (builder).
    pub fn with_size(mut self, width: impl Into<String>, height: impl Into<String>) -> Self {
        self.width = Some(width.into());
        self.height = Some(height.into());
        self
    }

    /// Set the fallback color (builder).
    pub fn with_fallback(mut self, color: impl Into<String>) -> Self {
        self.fallback = Some(color.into());
        self
    }

    fn from_tree(tree: &Tree) -> Option<Self> {
        let texts: Option<Vec<String>> = tree.children().iter().map(Tree::to_text).collect();
        let mut texts = texts?.into_iter();
        let image = texts.next()?;
        Some(PatternRef {
            image,
            width: texts.next(),
            height: texts.next(),
            fallback: texts.next(),
        })
    }

    fn to_tree(&self) -> Tree {
        let children = std::iter::once(&self.image)
            .chain(self.width.as_ref())
            .chain(self.height.as_ref())
            .chain(self.fallback.as_ref())
            .map(|s| Tree::atom(s.as_str()))
            .collect();
        Tree::compound(PATTERN, children)
    }
}

/// A literal value bound to a symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    /// Hex color including the `#`, e.g. `#f0ffb0`.
    Color(String),
    Length(Length),
    Number(Number),
    Pattern(PatternRef),
    Text(String),
    /// Markup that is not a single literal, kept for the renderer.
    Tree(Tree),
}

impl Value {
    /// Classify an atom.
    pub fn from_atom(s: &str) -> Self {
        match s {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
        if is_hex_color(s) {
            return Value::Color(s.to_string());
        }
        if let Some(len) = Length::parse(s) {
            return Value::Length(len);
        }
        if let Some(n) = Number::parse(s) {
            return Value::Number(n);
        }
        Value::Text(s.to_string())
    }

    /// Classify a tree.
    pub fn from_tree(tree: &Tree) -> Self {
        match tree {
            Tree::Atom(s) => Value::from_atom(s),
            t if t.is(PATTERN) => PatternRef::from_tree(t)
                .map(Value::Pattern)
                .unwrap_or_else(|| Value::Tree(t.clone())),
            t => Value::Tree(t.clone()),
        }
    }

    /// Convert back to markup.
    pub fn to_tree(&self) -> Tree {
        match self {
            Value::Bool(b) => Tree::atom(b.to_string()),
            Value::Color(c) => Tree::atom(c.as_str()),
            Value::Length(l) => Tree::atom(l.to_string()),
            Value::Number(n) => Tree::atom(n.as_str()),
            Value::Pattern(p) => p.to_tree(),
            Value::Text(s) => Tree::atom(s.as_str()),
            Value::Tree(t) => t.clone(),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }
}

fn is_hex_color(s: &str) -> bool {
    s.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

/// A macro: ordered parameter names and a body template.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    params: Vec<String>,
    body: Tree,
}

impl MacroDef {
    /// Create a macro, rejecting repeated parameter names.
    pub fn new(params: Vec<String>, body: Tree) -> Result<Self, StyleError> {
        let mut seen = HashSet::new();
        for p in &params {
            if !seen.insert(p.as_str()) {
                return Err(StyleError::DuplicateParameter(p.clone()));
            }
        }
        Ok(Self { params, body })
    }

    /// Read a `<macro|p1|...|body>` literal.
    pub fn from_tree(tree: &Tree) -> Result<Self, StyleError> {
        let children = tree.children();
        let Some((body, params)) = children.split_last() else {
            return MacroDef::new(Vec::new(), Tree::atom(""));
        };
        let params = params
            .iter()
            .map(|p| {
                p.as_atom()
                    .map(str::to_string)
                    .ok_or_else(|| StyleError::invalid(MACRO, format!("parameter is not a name: {p}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        MacroDef::new(params, body.clone())
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &Tree {
        &self.body
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Write as a `<macro|...>` literal.
    pub fn to_tree(&self) -> Tree {
        let mut children: Vec<Tree> = self.params.iter().map(|p| Tree::atom(p.as_str())).collect();
        children.push(self.body.clone());
        Tree::compound(MACRO, children)
    }
}

/// What a symbol name is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Literal(Value),
    Macro(MacroDef),
    /// Read-through to another symbol, resolved at lookup time.
    Alias(String),
}

impl Binding {
    /// Bind an evaluated tree: macro literals become macros, everything else a literal.
    pub fn from_tree(tree: &Tree) -> Result<Self, StyleError> {
        if tree.is(MACRO) {
            MacroDef::from_tree(tree).map(Binding::Macro)
        } else {
            Ok(Binding::Literal(Value::from_tree(tree)))
        }
    }

    pub fn literal(s: &str) -> Self {
        Binding::Literal(Value::from_atom(s))
    }

    pub fn alias(target: impl Into<String>) -> Self {
        Binding::Alias(target.into())
    }

    pub fn to_tree(&self) -> Tree {
        match self {
            Binding::Literal(v) => v.to_tree(),
            Binding::Macro(m) => m.to_tree(),
            Binding::Alias(target) => Tree::compound("value", vec![Tree::atom(target.as_str())]),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Binding::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_macro(&self) -> Option<&MacroDef> {
        match self {
            Binding::Macro(m) => Some(m),
            _ => None,
        }
    }
}
