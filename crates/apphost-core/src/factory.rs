//! Composition root: turns configuration records into unstarted workers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::bootstrap::{Bootstrap, BootstrapError};
use crate::chain::ResolutionChain;
use crate::config::{ApplicationConfig, LoaderDescriptor};
use crate::error::BuildError;
use crate::registry::ClassLoaderRegistry;
use crate::resolver::{Resolver, ResolverError};
use crate::worker::{ApplicationWorker, DEFAULT_IDLE_INTERVAL};

/// Receives finished workers and supplies host-wide paths.
pub trait Container {
    /// Host install root.
    fn base_directory(&self) -> &str;

    /// Root directory of all hosted applications.
    fn app_base(&self) -> &str;

    /// The host-wide resolution chain workers register into.
    fn shared_chain(&self) -> Arc<ResolutionChain>;

    /// Idle quantum for new workers.
    fn idle_interval(&self) -> Duration {
        DEFAULT_IDLE_INTERVAL
    }

    /// Take ownership of an unstarted worker.
    fn add_application(&mut self, worker: ApplicationWorker) -> Result<(), BuildError>;
}

/// Constructs a resolver from its descriptor.
///
/// The worker is passed so relative paths can be resolved against its
/// webapp path; name and app base are already injected.
pub type ResolverConstructor =
    fn(&LoaderDescriptor, &ApplicationWorker) -> Result<Arc<dyn Resolver>, ResolverError>;

/// Constructs the bootstrap for an application type.
pub type BootstrapConstructor =
    fn(&ApplicationConfig) -> Result<Arc<dyn Bootstrap>, BootstrapError>;

/// A nested factory that may register any number of class loaders for one
/// descriptor.
pub trait LoaderFactory: Send + Sync {
    /// Populate `worker` from `descriptor`, building resolvers of the
    /// descriptor's type through `construct`.
    fn visit(
        &self,
        worker: &mut ApplicationWorker,
        descriptor: &LoaderDescriptor,
        construct: ResolverConstructor,
    ) -> Result<(), ResolverError>;
}

/// Closed table of configuration type names.
///
/// Populated once at startup; unknown names fail the build.
#[derive(Default)]
pub struct TypeRegistry {
    applications: HashMap<String, BootstrapConstructor>,
    resolvers: HashMap<String, ResolverConstructor>,
    factories: HashMap<String, Arc<dyn LoaderFactory>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application type.
    pub fn register_application(
        &mut self,
        kind: impl Into<String>,
        construct: BootstrapConstructor,
    ) {
        self.applications.insert(kind.into(), construct);
    }

    /// Register a resolver type.
    pub fn register_resolver(&mut self, kind: impl Into<String>, construct: ResolverConstructor) {
        self.resolvers.insert(kind.into(), construct);
    }

    /// Register a nested loader factory.
    pub fn register_factory(&mut self, name: impl Into<String>, factory: Arc<dyn LoaderFactory>) {
        self.factories.insert(name.into(), factory);
    }

    pub fn application(&self, kind: &str) -> Option<BootstrapConstructor> {
        self.applications.get(kind).copied()
    }

    pub fn resolver(&self, kind: &str) -> Option<ResolverConstructor> {
        self.resolvers.get(kind).copied()
    }

    pub fn factory(&self, name: &str) -> Option<&Arc<dyn LoaderFactory>> {
        self.factories.get(name)
    }

    /// Registered application types, sorted.
    pub fn application_types(&self) -> Vec<&str> {
        sorted_keys(self.applications.keys())
    }

    /// Registered resolver types, sorted.
    pub fn resolver_types(&self) -> Vec<&str> {
        sorted_keys(self.resolvers.keys())
    }

    /// Registered loader factories, sorted.
    pub fn factory_names(&self) -> Vec<&str> {
        sorted_keys(self.factories.keys())
    }
}

fn sorted_keys<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let mut keys: Vec<&str> = keys.map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

/// Builds one worker per application configuration.
#[derive(Clone, Copy)]
pub struct ApplicationFactory<'a> {
    types: &'a TypeRegistry,
}

impl<'a> ApplicationFactory<'a> {
    pub fn new(types: &'a TypeRegistry) -> Self {
        Self { types }
    }

    /// Assemble a worker and hand it to `container`.
    ///
    /// All-or-nothing: on error the container receives nothing.
    pub fn build<C>(&self, container: &mut C, config: &ApplicationConfig) -> Result<(), BuildError>
    where
        C: Container + ?Sized,
    {
        let worker = self.assemble(&*container, config)?;
        container.add_application(worker)?;
        info!(app = %config.name, kind = %config.kind, "application built");
        Ok(())
    }

    /// Assemble an unstarted worker without registering it.
    pub fn assemble<C>(
        &self,
        container: &C,
        config: &ApplicationConfig,
    ) -> Result<ApplicationWorker, BuildError>
    where
        C: Container + ?Sized,
    {
        let construct = self
            .types
            .application(&config.kind)
            .ok_or_else(|| BuildError::UnknownApplicationType {
                application: config.name.clone(),
                kind: config.kind.clone(),
            })?;
        let bootstrap = construct(config).map_err(|source| BuildError::InvalidApplication {
            application: config.name.clone(),
            source,
        })?;

        let mut worker = ApplicationWorker::new(bootstrap);
        worker.inject_app_base(container.app_base());
        worker.inject_name(config.name.as_str());
        worker.inject_class_loaders(ClassLoaderRegistry::new());
        worker.inject_base_directory(
            config
                .base_directory
                .as_deref()
                .unwrap_or_else(|| container.base_directory()),
        );
        worker.inject_shared_chain(container.shared_chain());
        worker.inject_idle_interval(container.idle_interval());

        for descriptor in &config.loaders {
            self.add_loader(&mut worker, &config.name, descriptor)?;
        }
        Ok(worker)
    }

    fn add_loader(
        &self,
        worker: &mut ApplicationWorker,
        application: &str,
        descriptor: &LoaderDescriptor,
    ) -> Result<(), BuildError> {
        let construct = self
            .types
            .resolver(&descriptor.kind)
            .ok_or_else(|| BuildError::UnknownLoaderType {
                application: application.to_string(),
                loader: descriptor.name.clone(),
                kind: descriptor.kind.clone(),
            })?;
        let invalid = |source: ResolverError| BuildError::InvalidLoader {
            application: application.to_string(),
            loader: descriptor.name.clone(),
            source,
        };

        match &descriptor.factory {
            Some(name) => {
                let factory = self
                    .types
                    .factory(name)
                    .ok_or_else(|| BuildError::UnknownLoaderFactory {
                        application: application.to_string(),
                        loader: descriptor.name.clone(),
                        factory: name.clone(),
                    })?;
                factory.visit(worker, descriptor, construct).map_err(invalid)?;
                debug!(
                    app = application,
                    loader = %descriptor.name,
                    factory = %name,
                    "class loaders configured"
                );
            }
            None => {
                let resolver = construct(descriptor, worker).map_err(invalid)?;
                worker.add_class_loader(descriptor.name.as_str(), resolver);
                debug!(
                    app = application,
                    loader = %descriptor.name,
                    kind = %descriptor.kind,
                    "class loader configured"
                );
            }
        }
        Ok(())
    }
}
