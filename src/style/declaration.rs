//! File-level declarations: the records a style file is made of.

use crate::engine::error::StyleError;
use crate::engine::value::MACRO;
use crate::markup::Tree;

/// One top-level record of a style file or package.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// `<use-package|name>`
    UsePackage(String),
    /// `<assign|name|value>` where the value is not a macro literal.
    Assign { name: String, value: Tree },
    /// `<assign|name|<macro|p1|...|body>>`
    DefineMacro {
        name: String,
        params: Vec<String>,
        body: Tree,
    },
    /// `<copy-theme|target|source>`
    CopyTheme { target: String, source: String },
    /// `<select-theme|family|theme>`
    SelectTheme { family: String, theme: String },
    /// `<new-theme|name|member|...>`
    NewTheme { name: String, members: Vec<String> },
    /// Any other markup; evaluated only for the assignments it performs.
    Content(Tree),
}

impl Declaration {
    /// Read the declarations in one top-level paragraph.
    ///
    /// `<use-package|a|b>` yields one record per package. Empty paragraphs
    /// yield nothing.
    pub fn from_tree(tree: &Tree) -> Result<Vec<Declaration>, StyleError> {
        let Tree::Compound { tag, children } = tree else {
            return Ok(if tree.is_empty_atom() {
                Vec::new()
            } else {
                vec![Declaration::Content(tree.clone())]
            });
        };

        let decl = match tag.as_str() {
            "use-package" => {
                return children
                    .iter()
                    .map(|c| name_of(tag, c).map(Declaration::UsePackage))
                    .collect();
            }
            "assign" => {
                let [name, value] = children.as_slice() else {
                    return Err(StyleError::invalid(tag, "expected a name and a value"));
                };
                let Some(name) = name.to_text() else {
                    // Computed names are evaluated like any other content.
                    return Ok(vec![Declaration::Content(tree.clone())]);
                };
                if value.is(MACRO) {
                    let (body, params) = match value.children().split_last() {
                        Some((body, params)) => (body.clone(), params),
                        None => (Tree::atom(""), &[][..]),
                    };
                    let params = params
                        .iter()
                        .map(|p| name_of(MACRO, p))
                        .collect::<Result<Vec<_>, _>>()?;
                    Declaration::DefineMacro { name, params, body }
                } else {
                    Declaration::Assign {
                        name,
                        value: value.clone(),
                    }
                }
            }
            "copy-theme" => {
                let (target, source) = pair(tag, children)?;
                Declaration::CopyTheme { target, source }
            }
            "select-theme" => {
                let (family, theme) = pair(tag, children)?;
                Declaration::SelectTheme { family, theme }
            }
            "new-theme" => {
                let Some((name, members)) = children.split_first() else {
                    return Err(StyleError::invalid(tag, "missing theme name"));
                };
                Declaration::NewTheme {
                    name: name_of(tag, name)?,
                    members: members
                        .iter()
                        .map(|m| name_of(tag, m))
                        .collect::<Result<Vec<_>, _>>()?,
                }
            }
            _ => Declaration::Content(tree.clone()),
        };
        Ok(vec![decl])
    }

    /// Write this record back as markup.
    pub fn to_tree(&self) -> Tree {
        match self {
            Declaration::UsePackage(name) => atoms("use-package", &[name.as_str()]),
            Declaration::Assign { name, value } => {
                Tree::compound("assign", vec![Tree::atom(name.as_str()), value.clone()])
            }
            Declaration::DefineMacro { name, params, body } => {
                let mut children: Vec<Tree> = params.iter().map(|p| Tree::atom(p.as_str())).collect();
                children.push(body.clone());
                Tree::compound(
                    "assign",
                    vec![Tree::atom(name.as_str()), Tree::compound(MACRO, children)],
                )
            }
            Declaration::CopyTheme { target, source } => atoms("copy-theme", &[target.as_str(), source.as_str()]),
            Declaration::SelectTheme { family, theme } => atoms("select-theme", &[family.as_str(), theme.as_str()]),
            Declaration::NewTheme { name, members } => {
                let mut names = vec![name.as_str()];
                names.extend(members.iter().map(String::as_str));
                atoms("new-theme", &names)
            }
            Declaration::Content(tree) => tree.clone(),
        }
    }
}

fn atoms(tag: &str, names: &[&str]) -> Tree {
    Tree::compound(tag, names.iter().map(|n| Tree::atom(*n)).collect())
}

fn name_of(tag: &str, tree: &Tree) -> Result<String, StyleError> {
    tree.to_text()
        .ok_or_else(|| StyleError::invalid(tag, format!("expected a name, got {tree}")))
}

fn pair(tag: &str, children: &[Tree]) -> Result<(String, String), StyleError> {
    match children {
        [a, b] => Ok((name_of(tag, a)?, name_of(tag, b)?)),
        _ => Err(StyleError::invalid(
            tag,
            format!("expected 2 arguments, got {}", children.len()),
        )),
    }
}
