//! Loader factory that registers one resolver per namespace.

use apphost_core::{
    ApplicationWorker, LoaderDescriptor, LoaderFactory, ResolverConstructor, ResolverError,
};
use tracing::debug;

/// Expands `settings.namespaces = { prefix = "dir", ... }` into one resolver
/// of the descriptor's type per namespace, named `<descriptor>:<prefix>`.
///
/// Namespaces are registered in prefix order. Settings other than
/// `namespaces` are passed through to every generated loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleFactory;

impl BundleFactory {
    pub const NAME: &'static str = "bundle";
}

impl LoaderFactory for BundleFactory {
    fn visit(
        &self,
        worker: &mut ApplicationWorker,
        descriptor: &LoaderDescriptor,
        construct: ResolverConstructor,
    ) -> Result<(), ResolverError> {
        let namespaces = descriptor
            .setting_table("namespaces")
            .filter(|namespaces| !namespaces.is_empty())
            .ok_or_else(|| {
                ResolverError::InvalidSettings(format!(
                    "loader '{}': 'namespaces' must be a non-empty table",
                    descriptor.name
                ))
            })?;

        let mut children = Vec::with_capacity(namespaces.len());
        for (prefix, path) in namespaces {
            let path = path.as_str().ok_or_else(|| {
                ResolverError::InvalidSettings(format!(
                    "loader '{}': directory of namespace '{prefix}' must be a string",
                    descriptor.name
                ))
            })?;

            let name = format!("{}:{prefix}", descriptor.name);
            let mut child = LoaderDescriptor::new(name, descriptor.kind.as_str());
            child.settings = descriptor.settings.clone();
            child.settings.remove("namespaces");
            child.settings.insert("prefix".into(), prefix.as_str().into());
            child.settings.insert("path".into(), path.into());
            let resolver = construct(&child, worker)?;
            children.push((child.name, resolver));
        }

        for (name, resolver) in children {
            debug!(loader = %name, "bundle namespace registered");
            worker.add_class_loader(name, resolver);
        }
        Ok(())
    }
}
