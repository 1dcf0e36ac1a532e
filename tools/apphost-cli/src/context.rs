//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use apphost_host::{HostConfig, CONFIG_FILE_NAMES};

use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Host configuration.
    pub config: HostConfig,
    /// File the configuration was read from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = match config_path {
            Some(path) => {
                let path = resolve_path(&cwd, path);
                let config = HostConfig::load(&path)?;
                (config, Some(path))
            }
            // Try to find config in current directory or parent directories
            None => match Self::find_config(&cwd) {
                Some(path) => {
                    let config = HostConfig::load(&path)?;
                    (config, Some(path))
                }
                None => (HostConfig::default(), None),
            },
        };

        if let Some(path) = &config_path {
            output.debug(&format!("Using config {}", path.display()));
        }

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            for name in CONFIG_FILE_NAMES {
                let config_path = current.join(name);
                if config_path.is_file() {
                    return Some(config_path);
                }
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Where `config init` writes a new file.
    pub fn default_config_path(&self) -> PathBuf {
        self.cwd.join(CONFIG_FILE_NAMES[0])
    }
}

/// Resolve a path relative to the working directory.
fn resolve_path(cwd: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_config_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(".apphost.toml"), "").unwrap();

        assert_eq!(Context::find_config(&nested), Some(dir.path().join(".apphost.toml")));
    }

    #[test]
    fn test_find_config_prefers_first_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("apphost.json"), "{}").unwrap();
        std::fs::write(dir.path().join("apphost.toml"), "").unwrap();

        assert_eq!(Context::find_config(dir.path()), Some(dir.path().join("apphost.toml")));
    }

    #[test]
    fn test_resolve_path() {
        let cwd = Path::new("/work");
        assert_eq!(resolve_path(cwd, "apphost.toml"), PathBuf::from("/work/apphost.toml"));
        assert_eq!(resolve_path(cwd, "/etc/apphost.toml"), PathBuf::from("/etc/apphost.toml"));
    }
}
