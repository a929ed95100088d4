//! Markup engine: tokenizer, tree model, parser, writer.

pub mod model;
pub mod parser;
pub mod tokenizer;
pub mod writer;

pub use model::Tree;
pub use parser::{parse_markup, ParseError};
pub use writer::write_markup;
