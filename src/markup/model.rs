//! Markup AST: atoms and tagged compounds.

use std::fmt;

/// Tag of a paragraph sequence (block bodies, top-level documents).
pub const DOCUMENT: &str = "document";

/// Tag of an inline sequence mixing text and tags.
pub const CONCAT: &str = "concat";

/// A parsed markup tree.
///
/// Text is kept in [`Tree::Atom`]s; everything else is a tag applied to an
/// ordered list of children. `<assign|x|1>` is
/// `Compound { tag: "assign", children: [Atom("x"), Atom("1")] }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tree {
    /// A string leaf.
    Atom(String),
    /// A tag with its arguments.
    Compound { tag: String, children: Vec<Tree> },
}

impl Tree {
    /// Create an atom.
    pub fn atom(text: impl Into<String>) -> Self {
        Tree::Atom(text.into())
    }

    /// Create a compound node.
    pub fn compound(tag: impl Into<String>, children: Vec<Tree>) -> Self {
        Tree::Compound {
            tag: tag.into(),
            children,
        }
    }

    /// Create a document from paragraphs.
    pub fn document(paragraphs: Vec<Tree>) -> Self {
        Tree::compound(DOCUMENT, paragraphs)
    }

    /// Join inline items, collapsing adjacent atoms.
    ///
    /// Returns the single item itself when only one remains, and an empty atom
    /// when nothing remains.
    pub fn concat(items: Vec<Tree>) -> Self {
        let mut joined: Vec<Tree> = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Tree::Compound { tag, children } if tag == CONCAT => {
                    for child in children {
                        push_inline(&mut joined, child);
                    }
                }
                other => push_inline(&mut joined, other),
            }
        }
        joined.retain(|t| !matches!(t, Tree::Atom(s) if s.is_empty()));
        match joined.len() {
            0 => Tree::atom(""),
            1 => joined.pop().unwrap_or_else(|| Tree::atom("")),
            _ => Tree::compound(CONCAT, joined),
        }
    }

    /// Returns the atom's text, if this is an atom.
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Tree::Atom(s) => Some(s),
            Tree::Compound { .. } => None,
        }
    }

    /// Returns the tag, if this is a compound.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Tree::Atom(_) => None,
            Tree::Compound { tag, .. } => Some(tag),
        }
    }

    /// Returns `true` if this is a compound with the given tag.
    pub fn is(&self, name: &str) -> bool {
        self.tag() == Some(name)
    }

    /// Children of a compound; empty for atoms.
    pub fn children(&self) -> &[Tree] {
        match self {
            Tree::Atom(_) => &[],
            Tree::Compound { children, .. } => children,
        }
    }

    /// Returns the `i`th child, if present.
    pub fn child(&self, i: usize) -> Option<&Tree> {
        self.children().get(i)
    }

    /// Returns `true` for an empty atom.
    pub fn is_empty_atom(&self) -> bool {
        matches!(self, Tree::Atom(s) if s.is_empty())
    }

    /// Flattens a tree to its string content.
    ///
    /// Atoms are returned as-is; `concat` and `document` join their children.
    /// Returns `None` when any other tag is encountered.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Tree::Atom(s) => Some(s.clone()),
            Tree::Compound { tag, children } if tag == CONCAT || tag == DOCUMENT => {
                let mut out = String::new();
                for child in children {
                    out.push_str(&child.to_text()?);
                }
                Some(out)
            }
            Tree::Compound { .. } => None,
        }
    }
}

fn push_inline(joined: &mut Vec<Tree>, item: Tree) {
    if let (Some(Tree::Atom(last)), Tree::Atom(next)) = (joined.last_mut(), &item) {
        last.push_str(next);
        return;
    }
    joined.push(item);
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::markup::writer::write_inline(self))
    }
}

impl From<&str> for Tree {
    fn from(s: &str) -> Self {
        Tree::atom(s)
    }
}

impl From<String> for Tree {
    fn from(s: String) -> Self {
        Tree::Atom(s)
    }
}
