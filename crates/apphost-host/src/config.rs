//! Host configuration.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use apphost_core::ApplicationConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Config file names searched for, in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["apphost.toml", ".apphost.toml", "apphost.json"];

/// Host configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host install root.
    #[serde(default = "default_base_directory")]
    pub base_directory: String,

    /// Root directory of all hosted applications.
    #[serde(default = "default_app_base")]
    pub app_base: String,

    /// Idle quantum of every worker, in milliseconds.
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    /// Hosted applications, in start order.
    #[serde(default)]
    pub applications: Vec<ApplicationConfig>,
}

fn default_base_directory() -> String {
    "/opt/appserver".to_string()
}

fn default_app_base() -> String {
    "/opt/appserver/webapps".to_string()
}

fn default_idle_interval_ms() -> u64 {
    1000
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_directory: default_base_directory(),
            app_base: default_app_base(),
            idle_interval_ms: default_idle_interval_ms(),
            applications: Vec::new(),
        }
    }
}

impl HostConfig {
    /// Load config from a file. Paths ending in `.json` are parsed as JSON,
    /// everything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse config text, choosing the format from `path`'s extension.
    pub fn parse(path: impl AsRef<Path>, content: &str) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if is_json(path) {
            serde_json::from_str(content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })
        } else {
            toml::from_str(content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    /// Save config to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.render(path)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Render config in the format implied by `path`.
    pub fn render(&self, path: impl AsRef<Path>) -> Result<String, ConfigError> {
        if is_json(path.as_ref()) {
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
        } else {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
        }
    }

    /// Check the structural rules the factory does not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_base.is_empty() {
            return Err(ConfigError::EmptyAppBase);
        }
        if self.idle_interval_ms == 0 {
            return Err(ConfigError::ZeroIdleInterval);
        }

        let mut applications = HashSet::new();
        for application in &self.applications {
            if !applications.insert(application.name.as_str()) {
                return Err(ConfigError::DuplicateApplication(application.name.clone()));
            }
            let mut loaders = HashSet::new();
            for loader in &application.loaders {
                if !loaders.insert(loader.name.as_str()) {
                    return Err(ConfigError::DuplicateLoader {
                        application: application.name.clone(),
                        loader: loader.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Idle quantum as a duration.
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    /// An application by name.
    pub fn application(&self, name: &str) -> Option<&ApplicationConfig> {
        self.applications.iter().find(|app| app.name == name)
    }

    /// Applications that are not disabled, in configuration order.
    pub fn enabled(&self) -> impl Iterator<Item = &ApplicationConfig> {
        self.applications.iter().filter(|app| !app.disabled)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Generate a default apphost.toml config file.
pub fn generate_default_config(app_base: &str) -> String {
    format!(
        r#"# apphost configuration

base_directory = "/opt/appserver"
app_base = "{app_base}"
idle_interval_ms = 1000

[[applications]]
name = "example"
type = "kernel"

# Consulted last: configured first.
[[applications.loaders]]
name = "vendor"
type = "directory"
factory = "bundle"
settings = {{ namespaces = {{ app = "vendor/app" }} }}

# Consulted first: configured last.
[[applications.loaders]]
name = "app"
type = "directory"
settings = {{ prefix = "app", path = "src" }}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use apphost_core::LoaderDescriptor;

    fn sample() -> HostConfig {
        HostConfig {
            applications: vec![
                ApplicationConfig::new("shop", "kernel")
                    .with_loader(LoaderDescriptor::new("app", "static")),
                ApplicationConfig::new("blog", "passive"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = HostConfig::parse("apphost.toml", "").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.idle_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_default_config_parses_and_validates() {
        let text = generate_default_config("/srv/webapps");
        let config = HostConfig::parse("apphost.toml", &text).unwrap();
        config.validate().unwrap();

        assert_eq!(config.app_base, "/srv/webapps");
        let example = config.application("example").unwrap();
        assert_eq!(example.kind, "kernel");
        assert_eq!(example.loaders[0].factory.as_deref(), Some("bundle"));
        assert_eq!(example.loaders[1].setting_str("path"), Some("src"));
    }

    #[test]
    fn test_json_by_extension() {
        let json =
            r#"{ "app_base": "/srv", "applications": [{ "name": "shop", "type": "passive" }] }"#;
        let config = HostConfig::parse("apphost.json", json).unwrap();
        assert_eq!(config.app_base, "/srv");
        assert_eq!(config.applications[0].name, "shop");

        let err = HostConfig::parse("apphost.toml", json).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = sample();
        for name in ["apphost.toml", "apphost.json"] {
            let path = dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(HostConfig::load(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = HostConfig::load("/nonexistent/apphost.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_enabled_skips_disabled() {
        let mut config = sample();
        config.applications[0].disabled = true;
        let names: Vec<&str> = config.enabled().map(|app| app.name.as_str()).collect();
        assert_eq!(names, vec!["blog"]);
    }

    // === Validation ===

    #[test]
    fn test_validate_rejects_empty_app_base() {
        let config = HostConfig {
            app_base: String::new(),
            ..sample()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyAppBase)));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = HostConfig {
            idle_interval_ms: 0,
            ..sample()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroIdleInterval)));
    }

    #[test]
    fn test_validate_rejects_duplicate_application() {
        let mut config = sample();
        config.applications.push(ApplicationConfig::new("shop", "passive"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateApplication(name)) if name == "shop"
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_loader() {
        let mut config = sample();
        config.applications[1] = ApplicationConfig::new("blog", "passive")
            .with_loader(LoaderDescriptor::new("app", "static"))
            .with_loader(LoaderDescriptor::new("app", "directory"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateLoader { application, .. }) if application == "blog"
        ));
    }
}
