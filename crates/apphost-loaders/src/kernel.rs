//! Kernel bootstrap: binds the framework kernels before building the entry.

use std::sync::Arc;

use apphost_core::{
    ApplicationConfig, Bootstrap, BootstrapContext, BootstrapError, EntryHandle, Resolution,
};
use tracing::debug;

/// Default bindings, in the order they are resolved.
pub const DEFAULT_BINDINGS: [(&str, &str); 3] = [
    ("http_kernel", "app::http::Kernel"),
    ("console_kernel", "app::console::Kernel"),
    ("exception_handler", "app::exceptions::Handler"),
];

/// One binding and the definition that won it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub symbol: String,
    pub resolution: Resolution,
}

/// Entry object built by [`KernelBootstrap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kernel {
    webapp_path: String,
    bindings: Vec<Binding>,
}

impl Kernel {
    /// Path the kernel was built for.
    pub fn webapp_path(&self) -> &str {
        &self.webapp_path
    }

    /// A binding by name.
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.name == name)
    }

    /// All bindings, in resolution order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}

/// Resolves every kernel binding through the application's chain.
///
/// Symbols can be overridden with `settings.bindings = { http_kernel = "..." }`.
/// Unknown binding names in the override table are added after the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelBootstrap {
    bindings: Vec<(String, String)>,
}

impl Default for KernelBootstrap {
    fn default() -> Self {
        Self {
            bindings: DEFAULT_BINDINGS
                .iter()
                .map(|(name, symbol)| ((*name).to_string(), (*symbol).to_string()))
                .collect(),
        }
    }
}

impl KernelBootstrap {
    pub const KIND: &'static str = "kernel";

    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `symbol`, replacing an existing binding of that name.
    pub fn with_binding(mut self, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        let name = name.into();
        let symbol = symbol.into();
        match self.bindings.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => *existing = symbol,
            None => self.bindings.push((name, symbol)),
        }
        self
    }

    /// Build from an application configuration.
    pub fn from_config(config: &ApplicationConfig) -> Result<Self, BootstrapError> {
        let mut bootstrap = Self::new();
        let Some(value) = config.settings.get("bindings") else {
            return Ok(bootstrap);
        };
        let overrides = value.as_table().ok_or_else(|| {
            BootstrapError::InvalidSettings(format!(
                "application '{}': 'bindings' must be a table",
                config.name
            ))
        })?;
        for (name, symbol) in overrides {
            let symbol = symbol.as_str().ok_or_else(|| {
                BootstrapError::InvalidSettings(format!(
                    "application '{}': binding '{name}' must be a string",
                    config.name
                ))
            })?;
            bootstrap = bootstrap.with_binding(name.as_str(), symbol);
        }
        Ok(bootstrap)
    }

    /// Constructor registered under [`Self::KIND`].
    pub fn construct(config: &ApplicationConfig) -> Result<Arc<dyn Bootstrap>, BootstrapError> {
        Ok(Arc::new(Self::from_config(config)?))
    }
}

impl Bootstrap for KernelBootstrap {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn build_entry(&self, ctx: &BootstrapContext<'_>) -> Result<EntryHandle, BootstrapError> {
        let mut bindings = Vec::with_capacity(self.bindings.len());
        for (name, symbol) in &self.bindings {
            let resolution = ctx.resolve(symbol).ok_or_else(|| BootstrapError::Unresolved {
                binding: name.clone(),
                symbol: symbol.clone(),
            })?;
            debug!(binding = %name, loader = %resolution.loader, "kernel binding resolved");
            bindings.push(Binding {
                name: name.clone(),
                symbol: symbol.clone(),
                resolution,
            });
        }
        Ok(EntryHandle::new(Kernel {
            webapp_path: ctx.webapp_path.to_string(),
            bindings,
        }))
    }
}
