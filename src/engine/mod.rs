//! Style engine: bindings, macro expansion, packages and themes.
//!
//! Pipeline:
//! 1. **Declarations** from [`crate::style`] are applied to an [`Environment`]
//! 2. **Packages** are resolved through a [`PackageStore`] and loaded once
//! 3. **Macros** are expanded call-by-value; assignments they make come back as
//!    [`Effect`]s that the environment applies
//! 4. **Themes** are copied (snapshots) or selected (aliases) by name prefix

pub mod env;
pub mod error;
pub mod expander;
pub mod packages;
pub mod symbols;
pub mod themes;
pub mod value;

pub use env::Environment;
pub use error::StyleError;
pub use expander::{Effect, Expander, Expansion};
pub use packages::{ImageHandle, MemoryStore, PackageBundle, PackageLoader, PackageStore};
pub use symbols::{merge_name, SymbolTable};
pub use themes::{ThemeFamily, ThemeRegistry, ThemeState};
pub use value::{Binding, Length, MacroDef, Number, PatternRef, Value};
