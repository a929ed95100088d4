//! Engine error taxonomy.

use crate::markup::ParseError;

/// Errors raised while resolving styles, packages, macros and themes.
///
/// Every variant carries the offending name so the host can report it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StyleError {
    #[error("unbound symbol: {0}")]
    UnboundSymbol(String),
    #[error("cyclic alias while resolving {name}: {}", path.join(" -> "))]
    CyclicAlias { name: String, path: Vec<String> },
    #[error("cyclic package dependency on {name}: {}", chain.join(" -> "))]
    CyclicDependency { name: String, chain: Vec<String> },
    #[error("package not found: {0}")]
    PackageNotFound(String),
    #[error("asset not found: {0}")]
    AssetNotFound(String),
    #[error("macro {name} expects {expected} argument(s), got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("duplicate macro parameter: {0}")]
    DuplicateParameter(String),
    #[error("no symbols bound under theme prefix {0}")]
    EmptySourceTheme(String),
    #[error("unknown theme family: {0}")]
    UnknownFamily(String),
    #[error("symbol is not a macro: {0}")]
    NotAMacro(String),
    #[error("argument referenced outside its macro: {0}")]
    UnboundArgument(String),
    #[error("expansion of {name} exceeded the depth limit of {limit}")]
    ExpansionDepthExceeded { name: String, limit: usize },
    #[error("<{tag}> is nested deeper than {limit} levels")]
    NestingTooDeep { tag: String, limit: usize },
    #[error("invalid <{tag}> declaration: {message}")]
    InvalidDeclaration { tag: String, message: String },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl StyleError {
    /// Returns `true` for errors raised when a symbol is read rather than defined.
    ///
    /// The rendering side decides whether to substitute a default for these.
    pub fn is_lookup_error(&self) -> bool {
        matches!(
            self,
            StyleError::UnboundSymbol(_) | StyleError::CyclicAlias { .. }
        )
    }

    pub(crate) fn invalid(tag: &str, message: impl Into<String>) -> Self {
        StyleError::InvalidDeclaration {
            tag: tag.to_string(),
            message: message.into(),
        }
    }
}
