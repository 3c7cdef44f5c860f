//! Capability markers
//!
//! A marker ties a capability trait to the slot of a [`PluginUnit`] that
//! carries its implementations and to the tunnel decoration for it. The
//! registry is generic over the marker, so one registry type serves all
//! four capabilities.

use super::catalog::PluginUnit;
use crate::error::{Error, Result};
use crate::provider::{
    DataSourceTypes, GraphDataProvider, IndexProvider, MetadataProvider, TableDataProvider,
};
use crate::tunnel::{Tunnel, Tunneled};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Names a capability in manifests and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    Graph,
    Index,
    Metadata,
    Table,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 4] = [
        CapabilityKind::Graph,
        CapabilityKind::Index,
        CapabilityKind::Metadata,
        CapabilityKind::Table,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Graph => "graph",
            CapabilityKind::Index => "index",
            CapabilityKind::Metadata => "metadata",
            CapabilityKind::Table => "table",
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CapabilityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| Error::config(format!("Unknown capability: {s}")))
    }
}

/// A backend capability the registry can serve
pub trait Capability: Send + Sync + 'static {
    /// The capability trait object handed out by the registry
    type Provider: ?Sized + DataSourceTypes + 'static;

    const KIND: CapabilityKind;

    /// Implementations of this capability advertised by `unit`
    fn implementations(unit: &PluginUnit) -> Vec<Arc<Self::Provider>>;

    /// Route every call of `provider` through `tunnel`
    fn decorate(provider: Arc<Self::Provider>, tunnel: Arc<Tunnel>) -> Arc<Self::Provider>;
}

/// Graph query capability
#[derive(Debug, Clone, Copy)]
pub struct GraphQuery;

/// Bulk indexing capability
#[derive(Debug, Clone, Copy)]
pub struct Indexing;

/// Schema metadata capability
#[derive(Debug, Clone, Copy)]
pub struct Metadata;

/// Tabular query capability
#[derive(Debug, Clone, Copy)]
pub struct Tabular;

impl Capability for GraphQuery {
    type Provider = dyn GraphDataProvider;
    const KIND: CapabilityKind = CapabilityKind::Graph;

    fn implementations(unit: &PluginUnit) -> Vec<Arc<Self::Provider>> {
        unit.graph_providers().to_vec()
    }

    fn decorate(provider: Arc<Self::Provider>, tunnel: Arc<Tunnel>) -> Arc<Self::Provider> {
        Arc::new(Tunneled::new(provider, tunnel))
    }
}

impl Capability for Indexing {
    type Provider = dyn IndexProvider;
    const KIND: CapabilityKind = CapabilityKind::Index;

    fn implementations(unit: &PluginUnit) -> Vec<Arc<Self::Provider>> {
        unit.index_providers().to_vec()
    }

    fn decorate(provider: Arc<Self::Provider>, tunnel: Arc<Tunnel>) -> Arc<Self::Provider> {
        Arc::new(Tunneled::new(provider, tunnel))
    }
}

impl Capability for Metadata {
    type Provider = dyn MetadataProvider;
    const KIND: CapabilityKind = CapabilityKind::Metadata;

    fn implementations(unit: &PluginUnit) -> Vec<Arc<Self::Provider>> {
        unit.metadata_providers().to_vec()
    }

    fn decorate(provider: Arc<Self::Provider>, tunnel: Arc<Tunnel>) -> Arc<Self::Provider> {
        Arc::new(Tunneled::new(provider, tunnel))
    }
}

impl Capability for Tabular {
    type Provider = dyn TableDataProvider;
    const KIND: CapabilityKind = CapabilityKind::Table;

    fn implementations(unit: &PluginUnit) -> Vec<Arc<Self::Provider>> {
        unit.table_providers().to_vec()
    }

    fn decorate(provider: Arc<Self::Provider>, tunnel: Arc<Tunnel>) -> Arc<Self::Provider> {
        Arc::new(Tunneled::new(provider, tunnel))
    }
}
