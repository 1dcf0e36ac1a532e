//! Built-in resolver types, loader factories and application types.
//!
//! Everything here is reachable from configuration by name once registered
//! into a [`TypeRegistry`]:
//! - resolvers: `static`, `directory`
//! - loader factories: `bundle`
//! - applications: `kernel`, `passive`

mod bundle;
mod directory;
mod kernel;
mod passive;
mod static_resolver;

pub use bundle::*;
pub use directory::*;
pub use kernel::*;
pub use passive::*;
pub use static_resolver::*;

use std::sync::Arc;

use apphost_core::TypeRegistry;

/// Register every built-in type into `types`.
pub fn register_builtins(types: &mut TypeRegistry) {
    types.register_resolver(StaticResolver::KIND, StaticResolver::construct);
    types.register_resolver(DirectoryResolver::KIND, DirectoryResolver::construct);
    types.register_factory(BundleFactory::NAME, Arc::new(BundleFactory));
    types.register_application(KernelBootstrap::KIND, KernelBootstrap::construct);
    types.register_application(PassiveBootstrap::KIND, PassiveBootstrap::construct);
}

/// A type registry holding only the built-in types.
pub fn builtin_types() -> TypeRegistry {
    let mut types = TypeRegistry::new();
    register_builtins(&mut types);
    types
}
