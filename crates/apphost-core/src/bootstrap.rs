//! Hosted-framework bootstrap extension point.

use std::any::Any;
use std::fmt;

use crate::chain::{Resolution, ResolutionChain};

/// Opaque entry object returned by a bootstrap.
pub struct EntryHandle {
    type_name: &'static str,
    value: Box<dyn Any + Send>,
}

impl EntryHandle {
    /// Wrap a framework value.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Box::new(value),
        }
    }

    /// Type name of the wrapped value, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Take the wrapped value back if it is a `T`.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let type_name = self.type_name;
        self.value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|value| Self { type_name, value })
    }
}

impl fmt::Debug for EntryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryHandle")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// What a bootstrap gets to see while building the entry object.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapContext<'a> {
    /// Application name.
    pub name: &'a str,
    /// Path the framework is rooted at.
    pub webapp_path: &'a str,
    /// The application's local resolution chain, already activated.
    pub chain: &'a ResolutionChain,
}

impl BootstrapContext<'_> {
    /// Resolve a symbol through the application's local chain.
    pub fn resolve(&self, symbol: &str) -> Option<Resolution> {
        self.chain.resolve(symbol)
    }
}

/// Builds the hosted framework's entry object.
///
/// Invoked exactly once per worker, on the worker thread, after resolver
/// activation.
pub trait Bootstrap: Send + Sync + fmt::Debug {
    /// Configuration type name of this application kind (e.g. "kernel").
    fn kind(&self) -> &str;

    /// Build the entry object for the application at `ctx.webapp_path`.
    fn build_entry(&self, ctx: &BootstrapContext<'_>) -> Result<EntryHandle, BootstrapError>;
}

/// Errors raised while building an entry object.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("binding '{binding}' could not be resolved: no resolver knows '{symbol}'")]
    Unresolved { binding: String, symbol: String },

    #[error("webapp path not found: {0}")]
    MissingWebapp(String),

    #[error("invalid bootstrap settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Kernel(u32);

    #[test]
    fn test_entry_handle_downcast() {
        let entry = EntryHandle::new(Kernel(7));
        assert_eq!(entry.downcast_ref::<Kernel>(), Some(&Kernel(7)));
        assert!(entry.downcast_ref::<String>().is_none());
        assert!(entry.type_name().ends_with("Kernel"));
    }

    #[test]
    fn test_entry_handle_downcast_owned() {
        let entry = EntryHandle::new(Kernel(3));
        let entry = entry.downcast::<String>().unwrap_err();
        assert_eq!(entry.downcast::<Kernel>().ok(), Some(Kernel(3)));
    }

    #[test]
    fn test_context_resolves_through_chain() {
        let chain = ResolutionChain::new();
        let ctx = BootstrapContext {
            name: "shop",
            webapp_path: "/opt/apps/shop",
            chain: &chain,
        };
        assert!(ctx.resolve("Missing").is_none());
    }

    #[test]
    fn test_unresolved_display() {
        let err = BootstrapError::Unresolved {
            binding: "http_kernel".into(),
            symbol: "app::http::Kernel".into(),
        };
        assert_eq!(
            err.to_string(),
            "binding 'http_kernel' could not be resolved: no resolver knows 'app::http::Kernel'"
        );
    }
}
