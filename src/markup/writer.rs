//! Markup writer: trees back to style-file text.
//!
//! Compounds whose trailing children are documents are written in block form
//! (`<\tag|args>` ... `</tag>`); everything else is written inline.

use crate::markup::model::{Tree, CONCAT, DOCUMENT};

const INDENT: usize = 2;

/// Write top-level paragraphs, separated by blank lines.
pub fn write_markup(paragraphs: &[Tree]) -> String {
    let mut out = String::new();
    for (i, p) in paragraphs.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        write_paragraph(p, 0, &mut out);
    }
    out.push('\n');
    out
}

/// Write a single tree at indentation zero.
pub fn write_inline(tree: &Tree) -> String {
    let mut out = String::new();
    write_tree(tree, 0, &mut out);
    out
}

fn write_paragraph(tree: &Tree, indent: usize, out: &mut String) {
    if tree.is_empty_atom() {
        out.push_str("\\;");
    } else {
        write_tree(tree, indent, out);
    }
}

fn write_tree(tree: &Tree, indent: usize, out: &mut String) {
    match tree {
        Tree::Atom(s) => escape_into(s, out),
        Tree::Compound { tag, children } if tag == CONCAT => {
            for child in children {
                write_tree(child, indent, out);
            }
        }
        Tree::Compound { tag, children } if tag == DOCUMENT => {
            // A document outside block position: paragraphs on their own lines.
            write_sections(children, indent, out);
        }
        Tree::Compound { tag, children } => {
            let sections = children
                .iter()
                .rev()
                .take_while(|c| c.is(DOCUMENT))
                .count();
            if sections == 0 {
                out.push('<');
                out.push_str(tag);
                for child in children {
                    out.push('|');
                    write_tree(child, indent, out);
                }
                out.push('>');
                return;
            }

            let (inline, blocks) = children.split_at(children.len() - sections);
            out.push_str("<\\");
            out.push_str(tag);
            for child in inline {
                out.push('|');
                write_tree(child, indent, out);
            }
            out.push('>');
            for (i, block) in blocks.iter().enumerate() {
                if i > 0 {
                    out.push_str("<|");
                    out.push_str(tag);
                    out.push('>');
                }
                write_sections(block.children(), indent + INDENT, out);
                newline(indent, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn write_sections(paragraphs: &[Tree], indent: usize, out: &mut String) {
    for (i, p) in paragraphs.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        newline(indent, out);
        write_paragraph(p, indent, out);
    }
}

fn newline(indent: usize, out: &mut String) {
    out.push('\n');
    out.extend(std::iter::repeat(' ').take(indent));
}

fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '<' => out.push_str("<less>"),
            '>' => out.push_str("<gtr>"),
            '|' => out.push_str("<\\|>"),
            c => out.push(c),
        }
    }
}
