//! Core abstractions for hosting resident application workers.
//!
//! This crate provides the fundamental types and traits:
//! - `Resolver` - Maps symbolic names to loadable definitions
//! - `ClassLoaderRegistry` - Named, ordered resolvers owned by one application
//! - `ResolutionChain` - Ordered resolver chain consulted front-to-back
//! - `Bootstrap` - Hosted framework entry point, invoked once per worker
//! - `ApplicationWorker` / `WorkerHandle` - Dedicated-thread worker lifecycle
//! - `ApplicationFactory` / `TypeRegistry` - Configuration-driven assembly

mod bootstrap;
mod chain;
mod config;
mod error;
mod factory;
mod lifecycle;
mod registry;
mod resolver;
mod worker;

pub use bootstrap::*;
pub use chain::*;
pub use config::*;
pub use error::*;
pub use factory::*;
pub use lifecycle::*;
pub use registry::*;
pub use resolver::*;
pub use worker::*;
