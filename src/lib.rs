//! # stylebook
//!
//! A style composition engine for structured document markup.
//!
//! Style files declare symbols, macros and themes; packages pull in other
//! packages; themes are copied and selected by name prefix. stylebook parses
//! that markup, applies it to a session [`Environment`](engine::Environment)
//! and answers the renderer's questions about the resulting bindings.
//!
//! ## Core Systems
//!
//! - **[`markup`]**: Markup tokenizer, tree model, parser and writer
//! - **[`style`]**: Style files and the declarations they contain
//! - **[`engine`]**: Symbol table, macro expander, package loader, theme registry
//! - **[`config`]**: Expansion limits and built-in symbols
//!
//! ## Example
//!
//! ```
//! use stylebook::engine::{Environment, MemoryStore, Value};
//!
//! let mut store = MemoryStore::new();
//! store
//!     .insert_source("dark-combo", "<assign|dark-bg-color|#000000>")
//!     .unwrap();
//!
//! let mut env = Environment::new(store);
//! env.load_source("<use-package|dark-combo>\n\n<copy-theme|granite|dark>")
//!     .unwrap();
//! assert_eq!(
//!     env.symbol_value("granite-bg-color").unwrap(),
//!     Value::Color("#000000".into())
//! );
//! ```

// Foundation
pub mod config;
pub mod markup;

// Style files
pub mod style;

// Engine
pub mod engine;

pub use config::EngineConfig;
pub use engine::{Environment, StyleError};
pub use markup::Tree;
pub use style::{Declaration, StyleFile};
