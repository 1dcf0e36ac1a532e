//! Bootstrap that resolves nothing.

use std::sync::Arc;

use apphost_core::{ApplicationConfig, Bootstrap, BootstrapContext, BootstrapError, EntryHandle};

/// Builds a unit entry without consulting any resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassiveBootstrap;

impl PassiveBootstrap {
    pub const KIND: &'static str = "passive";

    pub fn construct(_config: &ApplicationConfig) -> Result<Arc<dyn Bootstrap>, BootstrapError> {
        Ok(Arc::new(Self))
    }
}

impl Bootstrap for PassiveBootstrap {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn build_entry(&self, _ctx: &BootstrapContext<'_>) -> Result<EntryHandle, BootstrapError> {
        Ok(EntryHandle::new(()))
    }
}
