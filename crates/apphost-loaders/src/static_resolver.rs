//! Fixed symbol table resolver.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use apphost_core::{ApplicationWorker, Definition, LoaderDescriptor, Resolver, ResolverError};

/// Resolves a fixed set of symbols to fixed locations.
///
/// Configured through `settings.symbols`, a table of symbol to location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticResolver {
    symbols: BTreeMap<String, PathBuf>,
}

impl StaticResolver {
    pub const KIND: &'static str = "static";

    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        self.symbols.insert(symbol.into(), location.into());
        self
    }

    /// Build from a loader descriptor.
    pub fn from_descriptor(descriptor: &LoaderDescriptor) -> Result<Self, ResolverError> {
        let mut resolver = Self::new();
        let Some(value) = descriptor.settings.get("symbols") else {
            return Ok(resolver);
        };
        let table = value.as_table().ok_or_else(|| {
            ResolverError::InvalidSettings(format!(
                "loader '{}': 'symbols' must be a table",
                descriptor.name
            ))
        })?;
        for (symbol, location) in table {
            let location = location.as_str().ok_or_else(|| {
                ResolverError::InvalidSettings(format!(
                    "loader '{}': location of '{symbol}' must be a string",
                    descriptor.name
                ))
            })?;
            resolver.symbols.insert(symbol.clone(), PathBuf::from(location));
        }
        Ok(resolver)
    }

    /// Constructor registered under [`Self::KIND`].
    pub fn construct(
        descriptor: &LoaderDescriptor,
        _worker: &ApplicationWorker,
    ) -> Result<Arc<dyn Resolver>, ResolverError> {
        Ok(Arc::new(Self::from_descriptor(descriptor)?))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Resolver for StaticResolver {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn resolve(&self, symbol: &str) -> Option<Definition> {
        self.symbols
            .get(symbol)
            .map(|location| Definition::new(symbol, location.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_known_symbols_only() {
        let resolver = StaticResolver::new().with_symbol("app::Kernel", "src/kernel.rs");
        let hit = resolver.resolve("app::Kernel").unwrap();
        assert_eq!(hit.location, PathBuf::from("src/kernel.rs"));
        assert!(resolver.resolve("app::Other").is_none());
    }

    #[test]
    fn test_from_descriptor() {
        let mut symbols = toml::Table::new();
        symbols.insert("app::Kernel".into(), "kernel.rs".into());
        symbols.insert("app::Handler".into(), "handler.rs".into());
        let descriptor = LoaderDescriptor::new("app", "static").with_setting("symbols", symbols);

        let resolver = StaticResolver::from_descriptor(&descriptor).unwrap();
        assert_eq!(resolver.len(), 2);
        assert!(resolver.resolve("app::Handler").is_some());
    }

    #[test]
    fn test_missing_symbols_is_empty() {
        let descriptor = LoaderDescriptor::new("app", "static");
        assert!(StaticResolver::from_descriptor(&descriptor).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_string_location() {
        let mut symbols = toml::Table::new();
        symbols.insert("app::Kernel".into(), 42.into());
        let descriptor = LoaderDescriptor::new("app", "static").with_setting("symbols", symbols);

        let err = StaticResolver::from_descriptor(&descriptor).unwrap_err();
        assert!(matches!(err, ResolverError::InvalidSettings(_)));
    }
}
