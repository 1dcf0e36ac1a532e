//! Application and class loader configuration records.

use serde::{Deserialize, Serialize};

/// Free-form settings attached to an application or loader.
pub type Settings = toml::Table;

fn is_empty(settings: &Settings) -> bool {
    settings.is_empty()
}

/// Configuration for one class loader of an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderDescriptor {
    /// Loader name, unique within the application.
    pub name: String,
    /// Resolver type name (e.g. "static", "directory").
    #[serde(rename = "type")]
    pub kind: String,
    /// Nested loader factory to delegate to instead of constructing `kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<String>,
    /// Type-specific settings.
    #[serde(default, skip_serializing_if = "is_empty")]
    pub settings: Settings,
}

impl LoaderDescriptor {
    /// Create a new loader descriptor.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            factory: None,
            settings: Settings::new(),
        }
    }

    /// Delegate construction to a nested loader factory.
    pub fn with_factory(mut self, factory: impl Into<String>) -> Self {
        self.factory = Some(factory.into());
        self
    }

    /// Set a setting value.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Get a string setting.
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(toml::Value::as_str)
    }

    /// Get a table setting.
    pub fn setting_table(&self, key: &str) -> Option<&Settings> {
        self.settings.get(key).and_then(toml::Value::as_table)
    }
}

/// Configuration for one hosted application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name, unique across the host.
    pub name: String,
    /// Application type name (e.g. "kernel").
    #[serde(rename = "type")]
    pub kind: String,
    /// Overrides the host's base directory for this application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_directory: Option<String>,
    /// Skip this application when building the host.
    #[serde(default)]
    pub disabled: bool,
    /// Type-specific settings.
    #[serde(default, skip_serializing_if = "is_empty")]
    pub settings: Settings,
    /// Class loaders in configuration order.
    #[serde(default)]
    pub loaders: Vec<LoaderDescriptor>,
}

impl ApplicationConfig {
    /// Create a new application configuration.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            base_directory: None,
            disabled: false,
            settings: Settings::new(),
            loaders: Vec::new(),
        }
    }

    /// Add a class loader.
    pub fn with_loader(mut self, loader: LoaderDescriptor) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Set a setting value.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Override the base directory.
    pub fn with_base_directory(mut self, base_directory: impl Into<String>) -> Self {
        self.base_directory = Some(base_directory.into());
        self
    }

    /// Get a table setting.
    pub fn setting_table(&self, key: &str) -> Option<&Settings> {
        self.settings.get(key).and_then(toml::Value::as_table)
    }
}
