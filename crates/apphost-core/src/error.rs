//! Error types for worker assembly and execution.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::resolver::ResolverError;

/// Errors that end a worker, or prevent it from starting.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// `start` was called before name and app base were injected.
    #[error("worker is not configured: {0}")]
    NotConfigured(&'static str),

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A class loader refused to activate.
    #[error("class loader '{loader}' failed to activate: {source}")]
    Activation {
        loader: String,
        #[source]
        source: ResolverError,
    },

    /// The entry object could not be built.
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),

    /// Activation or bootstrap panicked.
    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl WorkerError {
    /// Whether the worker had reached its own thread before failing.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Activation { .. } | Self::Bootstrap(_) | Self::Panicked(_)
        )
    }
}

/// Errors raised while assembling a worker from configuration.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("application '{application}': unknown application type '{kind}'")]
    UnknownApplicationType { application: String, kind: String },

    #[error("application '{application}': loader '{loader}' has unknown type '{kind}'")]
    UnknownLoaderType {
        application: String,
        loader: String,
        kind: String,
    },

    #[error("application '{application}': loader '{loader}' names unknown factory '{factory}'")]
    UnknownLoaderFactory {
        application: String,
        loader: String,
        factory: String,
    },

    #[error("application '{application}': loader '{loader}' is invalid: {source}")]
    InvalidLoader {
        application: String,
        loader: String,
        #[source]
        source: ResolverError,
    },

    #[error("application '{application}' is invalid: {source}")]
    InvalidApplication {
        application: String,
        #[source]
        source: BootstrapError,
    },

    #[error("application '{0}' is already registered")]
    DuplicateApplication(String),
}
