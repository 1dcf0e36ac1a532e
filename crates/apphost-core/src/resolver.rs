//! Resolver trait and activation flags.

use std::fmt;
use std::path::PathBuf;

/// A loadable definition located by a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    /// The symbol that was looked up.
    pub symbol: String,
    /// Where the definition lives.
    pub location: PathBuf,
}

impl Definition {
    /// Create a new definition.
    pub fn new(symbol: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            symbol: symbol.into(),
            location: location.into(),
        }
    }
}

/// Precedence requested when a resolver is activated.
///
/// `prepend` targets the application's own chain, `prepend_shared` the
/// host-wide chain. A `false` flag appends instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationFlags {
    /// Take precedence in the application-local chain.
    pub prepend: bool,
    /// Take precedence in the shared chain.
    pub prepend_shared: bool,
}

impl ActivationFlags {
    /// Maximum precedence in both chains. Workers always activate with this.
    pub const PRECEDENCE: Self = Self {
        prepend: true,
        prepend_shared: true,
    };

    /// Lowest precedence in both chains.
    pub const APPEND: Self = Self {
        prepend: false,
        prepend_shared: false,
    };
}

impl Default for ActivationFlags {
    fn default() -> Self {
        Self::PRECEDENCE
    }
}

/// A collaborator that maps symbolic names to loadable definitions.
pub trait Resolver: Send + Sync + fmt::Debug {
    /// Configuration type name of this resolver (e.g. "static").
    fn kind(&self) -> &str;

    /// Look up a symbol. Returns `None` if this resolver does not know it.
    fn resolve(&self, symbol: &str) -> Option<Definition>;

    /// Prepare the resolver for installation into the resolution chains.
    ///
    /// Called on the worker thread, once, right before the resolver is
    /// installed. An error aborts the worker.
    fn activate(&self, flags: ActivationFlags) -> Result<(), ResolverError> {
        let _ = flags;
        Ok(())
    }
}

/// Errors raised by resolvers.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("resolver root not found: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("invalid resolver settings: {0}")]
    InvalidSettings(String),

    #[error("activation failed: {0}")]
    Activation(String),
}
