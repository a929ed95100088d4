//! Style files and the declarations they are made of.
//!
//! - [`declaration`] reads top-level records (`assign`, `use-package`,
//!   `copy-theme`, ...) out of markup trees
//! - [`file`] splits a style file into header, body and initial environment

pub mod declaration;
pub mod file;

pub use declaration::Declaration;
pub use file::StyleFile;
