//! Host error types.

use std::path::PathBuf;

use apphost_core::WorkerError;
use thiserror::Error;

/// Errors from loading, saving or validating a host configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON config {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("app_base must not be empty")]
    EmptyAppBase,

    #[error("idle_interval_ms must be greater than zero")]
    ZeroIdleInterval,

    #[error("application '{0}' is configured more than once")]
    DuplicateApplication(String),

    #[error("application '{application}' configures loader '{loader}' more than once")]
    DuplicateLoader { application: String, loader: String },
}

/// Errors from driving applications through the host.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("unknown application '{0}'")]
    UnknownApplication(String),

    #[error("application '{0}' was already started")]
    AlreadyStarted(String),

    #[error("application '{0}' has not been started")]
    NotStarted(String),

    #[error("application '{0}' has already stopped")]
    AlreadyStopped(String),

    #[error("application '{application}' failed: {source}")]
    Worker {
        application: String,
        #[source]
        source: WorkerError,
    },
}
