//! Style files: header, body and initial environment.
//!
//! ```text
//! <TeXmacs|1.99.9>
//!
//! <style|source>
//!
//! <\body>
//!   ...declarations...
//! </body>
//!
//! <\initial>
//!   <\collection>
//!     <associate|sfactor|7>
//!   </collection>
//! </initial>
//! ```
//!
//! Only the body is required. Text without a `<\body>` block is read as a
//! bare list of declarations.

use crate::engine::error::StyleError;
use crate::markup::model::{CONCAT, DOCUMENT};
use crate::markup::{parse_markup, write_markup, Tree};
use crate::style::declaration::Declaration;

/// Title tags whose second argument is the package version.
const VERSIONED_TITLES: [&str; 3] = ["src-package", "src-package-dtd", "src-style-file"];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleFile {
    /// Format version from the `<TeXmacs|...>` header.
    pub version: Option<String>,
    /// Styles the file is written in, from `<style|...>`.
    pub styles: Vec<String>,
    /// Body paragraphs.
    pub body: Vec<Tree>,
    /// `associate` entries of the initial collection.
    pub initial: Vec<(String, Tree)>,
}

impl StyleFile {
    /// Parse a style file.
    pub fn parse(text: &str) -> Result<Self, StyleError> {
        let paragraphs = parse_markup(text)?;
        let mut file = StyleFile::default();
        let mut loose = Vec::new();
        let mut has_body = false;

        for p in paragraphs {
            match p.tag() {
                Some("TeXmacs") => file.version = p.child(0).and_then(Tree::to_text),
                Some("style") => file.styles = style_names(&p)?,
                Some("body") => {
                    has_body = true;
                    file.body = p.children().last().map(paragraphs_of).unwrap_or_default();
                }
                Some("initial") => collect_associates(&p, &mut file.initial)?,
                _ => loose.push(p),
            }
        }

        if !has_body {
            file.body = loose;
        }
        Ok(file)
    }

    /// The records in the body, in order.
    pub fn declarations(&self) -> Result<Vec<Declaration>, StyleError> {
        let mut out = Vec::new();
        for p in &self.body {
            out.extend(Declaration::from_tree(p)?);
        }
        Ok(out)
    }

    /// Version announced by the file's title block, e.g. `<src-package|x|1.0>`.
    pub fn title_version(&self) -> Option<String> {
        self.body.iter().find_map(find_title_version)
    }

    /// Write the file back as markup.
    pub fn to_markup(&self) -> String {
        let mut paragraphs = Vec::new();
        if let Some(version) = &self.version {
            paragraphs.push(Tree::compound("TeXmacs", vec![Tree::atom(version.as_str())]));
        }
        match self.styles.as_slice() {
            [] => {}
            [one] => paragraphs.push(Tree::compound("style", vec![Tree::atom(one.as_str())])),
            many => paragraphs.push(Tree::compound(
                "style",
                vec![Tree::compound(
                    "tuple",
                    many.iter().map(|s| Tree::atom(s.as_str())).collect(),
                )],
            )),
        }
        paragraphs.push(Tree::compound("body", vec![Tree::document(self.body.clone())]));
        if !self.initial.is_empty() {
            let associates = self
                .initial
                .iter()
                .map(|(k, v)| Tree::compound("associate", vec![Tree::atom(k.as_str()), v.clone()]))
                .collect();
            paragraphs.push(Tree::compound(
                "initial",
                vec![Tree::document(vec![Tree::compound(
                    "collection",
                    vec![Tree::document(vec![Tree::compound(CONCAT, associates)])],
                )])],
            ));
        }
        write_markup(&paragraphs)
    }
}

fn paragraphs_of(tree: &Tree) -> Vec<Tree> {
    if tree.is(DOCUMENT) {
        tree.children().to_vec()
    } else {
        vec![tree.clone()]
    }
}

fn style_names(tree: &Tree) -> Result<Vec<String>, StyleError> {
    let Some(arg) = tree.child(0) else {
        return Ok(Vec::new());
    };
    let names = if arg.is("tuple") { arg.children() } else { std::slice::from_ref(arg) };
    names
        .iter()
        .map(|n| {
            n.to_text()
                .ok_or_else(|| StyleError::invalid("style", format!("expected a style name, got {n}")))
        })
        .collect()
}

fn collect_associates(tree: &Tree, out: &mut Vec<(String, Tree)>) -> Result<(), StyleError> {
    if tree.is("associate") {
        let [key, value] = tree.children() else {
            return Err(StyleError::invalid("associate", "expected a key and a value"));
        };
        let key = key
            .to_text()
            .ok_or_else(|| StyleError::invalid("associate", format!("expected a key, got {key}")))?;
        out.push((key, value.clone()));
        return Ok(());
    }
    for child in tree.children() {
        collect_associates(child, out)?;
    }
    Ok(())
}

fn find_title_version(tree: &Tree) -> Option<String> {
    if VERSIONED_TITLES.iter().any(|t| tree.is(t)) {
        if let Some(v) = tree.child(1).and_then(Tree::to_text) {
            return Some(v);
        }
    }
    tree.children().iter().find_map(find_title_version)
}
