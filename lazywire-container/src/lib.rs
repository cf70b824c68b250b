//! Core container implementation for lazywire.
//!
//! Providers are declared with the functions in [`provider`], handed to a
//! [`Container`], validated once by [`Container::resolve`] and then built
//! on demand.

pub mod container;
pub mod error;
pub mod factory;
pub mod interface;
pub mod key;
pub mod provider;
pub mod snapshot;

mod graph;
mod matcher;
mod registry;

pub use container::{Container, Inject, Phase, prelude};
pub use error::{ConfigError, ConfigErrors, InjectorError, Result};
pub use factory::{Cleanup, Factory, FactoryShape, Injectable};
pub use interface::{Instance, Interface};
pub use key::DependencyKey;
pub use provider::{Provider, ProviderOptions, ProviderSet};
pub use snapshot::{BindingSnapshot, GraphSnapshot, NodeSnapshot};
