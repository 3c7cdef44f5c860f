//! Plugin registry
//!
//! Discovery runs once: manifests in a plugin directory are linked into
//! [`PluginUnit`]s, and a [`ProviderRegistry`] per capability maps each
//! data source type tag to the implementation that serves it.
//!
//! - [`PluginCatalog`] / [`PluginManifest`] / [`PluginLinker`] - discovery
//! - [`Capability`] and its markers - what a registry serves
//! - [`ProviderRegistry`] / [`Providers`] - tag resolution and tunneling

mod capability;
mod catalog;
mod providers;

pub use capability::{Capability, CapabilityKind, GraphQuery, Indexing, Metadata, Tabular};
pub use catalog::{PluginCatalog, PluginFactory, PluginLinker, PluginManifest, PluginUnit};
pub use providers::{ProviderRegistry, Providers};
