//! In-process host for apphost applications.
//!
//! - `HostConfig` - Host configuration file (TOML or JSON)
//! - `Host` - `Container` implementation that owns workers by name

mod config;
mod error;
mod host;

pub use config::*;
pub use error::*;
pub use host::*;
