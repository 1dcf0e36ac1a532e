//! Per-application class loader registry.

use std::fmt;
use std::sync::Arc;

use crate::resolver::Resolver;

/// Ordered, named resolvers owned by exactly one application.
///
/// Insertion order is preserved. Re-inserting an existing name replaces the
/// resolver in place, so the entry keeps its original position.
#[derive(Default)]
pub struct ClassLoaderRegistry {
    entries: Vec<(String, Arc<dyn Resolver>)>,
}

impl ClassLoaderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the resolver registered under `name`.
    pub fn put(&mut self, name: impl Into<String>, resolver: Arc<dyn Resolver>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = resolver,
            None => self.entries.push((name, resolver)),
        }
    }

    /// Get the resolver registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Resolver>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    /// Iterate resolvers in insertion order.
    ///
    /// The iterator is double-ended; activation walks it with `.rev()`.
    pub fn all(&self) -> impl DoubleEndedIterator<Item = &Arc<dyn Resolver>> + ExactSizeIterator {
        self.entries.iter().map(|(_, r)| r)
    }

    /// Iterate `(name, resolver)` pairs in insertion order.
    pub fn entries(
        &self,
    ) -> impl DoubleEndedIterator<Item = (&str, &Arc<dyn Resolver>)> + ExactSizeIterator {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Registered names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Check whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of registered resolvers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ClassLoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(n, r)| (n, r.kind())))
            .finish()
    }
}
