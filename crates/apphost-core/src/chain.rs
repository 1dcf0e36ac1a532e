//! Ordered resolution chains.
//!
//! A chain is consulted front-to-back; the first resolver that knows a
//! symbol wins. Each application has its own local chain, and the host owns
//! one shared chain that every application contributes to. Both start empty.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::resolver::{ActivationFlags, Definition, Resolver};

/// A resolver installed into a chain, tagged with its owner.
#[derive(Clone)]
pub struct ChainEntry {
    /// Application that installed the resolver.
    pub application: String,
    /// Loader name within that application.
    pub loader: String,
    /// The resolver itself.
    pub resolver: Arc<dyn Resolver>,
}

impl ChainEntry {
    /// Create a new chain entry.
    pub fn new(
        application: impl Into<String>,
        loader: impl Into<String>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        Self {
            application: application.into(),
            loader: loader.into(),
            resolver,
        }
    }
}

impl fmt::Debug for ChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainEntry")
            .field("application", &self.application)
            .field("loader", &self.loader)
            .field("kind", &self.resolver.kind())
            .finish()
    }
}

/// Result of a successful chain lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Application whose resolver answered.
    pub application: String,
    /// Loader that answered.
    pub loader: String,
    /// The definition found.
    pub definition: Definition,
}

/// An ordered resolver chain guarded by a lock.
///
/// Mutation happens only through a [`ChainWriter`] during activation and
/// through [`ResolutionChain::withdraw`] when an application terminates.
#[derive(Debug, Default)]
pub struct ResolutionChain {
    entries: RwLock<Vec<ChainEntry>>,
}

impl ResolutionChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty chain behind an `Arc`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Resolve a symbol front-to-back.
    pub fn resolve(&self, symbol: &str) -> Option<Resolution> {
        self.read().iter().find_map(|entry| {
            entry.resolver.resolve(symbol).map(|definition| Resolution {
                application: entry.application.clone(),
                loader: entry.loader.clone(),
                definition,
            })
        })
    }

    /// Snapshot of `(application, loader)` pairs in lookup order.
    pub fn order(&self) -> Vec<(String, String)> {
        self.read()
            .iter()
            .map(|e| (e.application.clone(), e.loader.clone()))
            .collect()
    }

    /// Snapshot of the chain entries in lookup order.
    pub fn entries(&self) -> Vec<ChainEntry> {
        self.read().clone()
    }

    /// Remove every entry installed by `application`. Returns how many were removed.
    pub fn withdraw(&self, application: &str) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|e| e.application != application);
        before - entries.len()
    }

    /// Number of installed resolvers.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<ChainEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<ChainEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One locked chain plus the insertion cursor for the current pass.
struct Section<'a> {
    entries: RwLockWriteGuard<'a, Vec<ChainEntry>>,
    cursor: usize,
}

impl Section<'_> {
    fn install(&mut self, entry: ChainEntry, prepend: bool) {
        if prepend {
            self.entries.insert(self.cursor, entry);
            self.cursor += 1;
        } else {
            self.entries.push(entry);
        }
    }
}

/// Exclusive writer over a local and a shared chain for one activation pass.
///
/// Holding the writer serializes whole passes: another worker's pass on the
/// same shared chain waits until this one is dropped. Prepended entries land
/// in front of everything that was in the chain before the pass, in the
/// order they are installed.
pub struct ChainWriter<'a> {
    shared: Option<Section<'a>>,
    local: Section<'a>,
}

impl<'a> ChainWriter<'a> {
    /// Lock both chains, shared first.
    ///
    /// If `local` and `shared` are the same chain it is locked once and each
    /// resolver is installed once.
    pub fn open(local: &'a ResolutionChain, shared: &'a ResolutionChain) -> Self {
        let shared = if std::ptr::eq(local, shared) {
            None
        } else {
            Some(Section {
                entries: shared.write(),
                cursor: 0,
            })
        };
        Self {
            shared,
            local: Section {
                entries: local.write(),
                cursor: 0,
            },
        }
    }

    /// Install one resolver into both chains according to `flags`.
    pub fn install(&mut self, entry: ChainEntry, flags: ActivationFlags) {
        match self.shared.as_mut() {
            Some(shared) => {
                shared.install(entry.clone(), flags.prepend_shared);
                self.local.install(entry, flags.prepend);
            }
            None => self
                .local
                .install(entry, flags.prepend || flags.prepend_shared),
        }
    }

    /// Number of entries installed into the local chain so far by prepending.
    pub fn installed(&self) -> usize {
        self.local.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Knows {
        tag: &'static str,
        symbols: &'static [&'static str],
    }

    impl Resolver for Knows {
        fn kind(&self) -> &str {
            "knows"
        }

        fn resolve(&self, symbol: &str) -> Option<Definition> {
            self.symbols
                .iter()
                .any(|s| *s == symbol)
                .then(|| Definition::new(symbol, self.tag))
        }
    }

    fn entry(app: &str, tag: &'static str, symbols: &'static [&'static str]) -> ChainEntry {
        ChainEntry::new(app, tag, Arc::new(Knows { tag, symbols }))
    }

    fn loaders(chain: &ResolutionChain) -> Vec<String> {
        chain.order().into_iter().map(|(_, l)| l).collect()
    }

    #[test]
    fn test_empty_chain_resolves_nothing() {
        let chain = ResolutionChain::new();
        assert!(chain.is_empty());
        assert!(chain.resolve("Anything").is_none());
    }

    #[test]
    fn test_prepend_pass_keeps_install_order_in_front() {
        let local = ResolutionChain::new();
        let shared = ResolutionChain::new();
        {
            let mut writer = ChainWriter::open(&local, &shared);
            writer.install(entry("old", "old", &[]), ActivationFlags::PRECEDENCE);
        }
        {
            let mut writer = ChainWriter::open(&local, &shared);
            writer.install(entry("app", "c", &[]), ActivationFlags::PRECEDENCE);
            writer.install(entry("app", "b", &[]), ActivationFlags::PRECEDENCE);
            writer.install(entry("app", "a", &[]), ActivationFlags::PRECEDENCE);
            assert_eq!(writer.installed(), 3);
        }

        assert_eq!(loaders(&local), vec!["c", "b", "a", "old"]);
        assert_eq!(loaders(&shared), vec!["c", "b", "a", "old"]);
    }

    #[test]
    fn test_append_flags_go_to_back() {
        let local = ResolutionChain::new();
        let shared = ResolutionChain::new();
        let mut writer = ChainWriter::open(&local, &shared);
        writer.install(entry("app", "first", &[]), ActivationFlags::PRECEDENCE);
        writer.install(
            entry("app", "late", &[]),
            ActivationFlags {
                prepend: true,
                prepend_shared: false,
            },
        );
        writer.install(entry("app", "second", &[]), ActivationFlags::PRECEDENCE);
        drop(writer);

        assert_eq!(loaders(&local), vec!["first", "late", "second"]);
        assert_eq!(loaders(&shared), vec!["first", "second", "late"]);
    }

    #[test]
    fn test_first_match_wins() {
        let chain = ResolutionChain::new();
        let other = ResolutionChain::new();
        {
            let mut writer = ChainWriter::open(&chain, &other);
            writer.install(entry("app", "c", &["Shared"]), ActivationFlags::PRECEDENCE);
            writer.install(
                entry("app", "b", &["Shared", "OnlyB"]),
                ActivationFlags::PRECEDENCE,
            );
        }

        let hit = chain.resolve("Shared").map(|r| r.loader);
        assert_eq!(hit.as_deref(), Some("c"));
        let hit = chain.resolve("OnlyB").map(|r| r.loader);
        assert_eq!(hit.as_deref(), Some("b"));
        assert!(chain.resolve("Unknown").is_none());
    }

    #[test]
    fn test_same_chain_installs_once() {
        let chain = ResolutionChain::new();
        let mut writer = ChainWriter::open(&chain, &chain);
        writer.install(entry("app", "only", &[]), ActivationFlags::PRECEDENCE);
        drop(writer);

        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_withdraw_removes_only_owner() {
        let local = ResolutionChain::new();
        let shared = ResolutionChain::new();
        {
            let mut writer = ChainWriter::open(&local, &shared);
            writer.install(entry("shop", "a", &[]), ActivationFlags::PRECEDENCE);
            writer.install(entry("blog", "b", &[]), ActivationFlags::PRECEDENCE);
            writer.install(entry("shop", "c", &[]), ActivationFlags::PRECEDENCE);
        }

        assert_eq!(shared.withdraw("shop"), 2);
        assert_eq!(loaders(&shared), vec!["b"]);
        assert_eq!(shared.withdraw("shop"), 0);
    }
}
