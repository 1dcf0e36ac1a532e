//! Namespace-to-directory resolver.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use apphost_core::{
    ActivationFlags, ApplicationWorker, Definition, LoaderDescriptor, Resolver, ResolverError,
};
use tracing::debug;

const SEPARATOR: &str = "::";

/// Maps symbols under a namespace prefix to source files under a root.
///
/// With prefix `app` and root `/srv/shop/src`, the symbol
/// `app::http::Kernel` resolves to `/srv/shop/src/http/Kernel.rs` if that
/// file exists. An empty prefix accepts every symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryResolver {
    prefix: String,
    root: PathBuf,
    extension: String,
}

impl DirectoryResolver {
    pub const KIND: &'static str = "directory";

    /// Default file extension.
    pub const DEFAULT_EXTENSION: &'static str = "rs";

    /// Create a resolver for `prefix` rooted at `root`.
    pub fn new(prefix: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            root: root.into(),
            extension: Self::DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Set the file extension, without the leading dot.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Build from a loader descriptor.
    ///
    /// A relative `path` is taken relative to `webapp_path`.
    pub fn from_descriptor(
        descriptor: &LoaderDescriptor,
        webapp_path: &str,
    ) -> Result<Self, ResolverError> {
        let path = descriptor.setting_str("path").ok_or_else(|| {
            ResolverError::InvalidSettings(format!("loader '{}': missing 'path'", descriptor.name))
        })?;
        let path = Path::new(path);
        let root = if path.is_relative() {
            Path::new(webapp_path).join(path)
        } else {
            path.to_path_buf()
        };

        let resolver = Self::new(descriptor.setting_str("prefix").unwrap_or_default(), root);
        Ok(match descriptor.setting_str("extension") {
            Some(extension) => resolver.with_extension(extension),
            None => resolver,
        })
    }

    /// Constructor registered under [`Self::KIND`].
    pub fn construct(
        descriptor: &LoaderDescriptor,
        worker: &ApplicationWorker,
    ) -> Result<Arc<dyn Resolver>, ResolverError> {
        Ok(Arc::new(Self::from_descriptor(descriptor, &worker.webapp_path())?))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a symbol would live in, whether or not it exists.
    ///
    /// Returns `None` for symbols outside the prefix and for any segment that
    /// could name a path outside the root.
    pub fn candidate(&self, symbol: &str) -> Option<PathBuf> {
        let relative = if self.prefix.is_empty() {
            symbol
        } else {
            symbol.strip_prefix(self.prefix.as_str())?.strip_prefix(SEPARATOR)?
        };

        let segments: Vec<&str> = relative.split(SEPARATOR).collect();
        let (file, dirs) = segments.split_last()?;
        if !segments.iter().all(|segment| is_plain_segment(segment)) {
            return None;
        }

        let mut path = self.root.clone();
        path.extend(dirs);
        path.push(format!("{file}.{}", self.extension));
        Some(path)
    }
}

/// A segment that names exactly one entry directly below its parent.
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
        && !Path::new(segment).is_absolute()
        && !segment.contains(':')
}

impl Resolver for DirectoryResolver {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn resolve(&self, symbol: &str) -> Option<Definition> {
        self.candidate(symbol)
            .filter(|path| path.is_file())
            .map(|path| Definition::new(symbol, path))
    }

    fn activate(&self, _flags: ActivationFlags) -> Result<(), ResolverError> {
        if !self.root.is_dir() {
            return Err(ResolverError::MissingRoot(self.root.clone()));
        }
        debug!(prefix = %self.prefix, root = %self.root.display(), "directory resolver ready");
        Ok(())
    }
}
