//! Tag to provider resolution

use super::capability::{Capability, CapabilityKind, GraphQuery, Indexing, Metadata, Tabular};
use super::catalog::{PluginCatalog, PluginLinker};
use crate::error::{Error, Result};
use crate::model::DataSourceInfo;
use crate::provider::{
    DataSourceTypes, GraphDataProvider, IndexProvider, MetadataProvider, TableDataProvider,
};
use crate::tunnel::Tunnel;
use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, Span};

/// Maps data source type tags to implementations of one capability
pub struct ProviderRegistry<C: Capability> {
    providers: BTreeMap<String, Arc<C::Provider>>,
    tunnel: Arc<Tunnel>,
    span: Span,
    _capability: PhantomData<C>,
}

impl<C: Capability> ProviderRegistry<C> {
    /// Register every implementation of `C` found in `catalog`.
    ///
    /// Units are visited in catalog order; when two implementations claim the
    /// same tag, the later one replaces the earlier.
    pub fn new(catalog: &PluginCatalog, tunnel: Arc<Tunnel>) -> Self {
        let mut providers: BTreeMap<String, Arc<C::Provider>> = BTreeMap::new();

        for unit in catalog.units() {
            for provider in C::implementations(unit) {
                for tag in provider.supported_data_source_types() {
                    debug!(capability = %C::KIND, plugin = %unit.name(), %tag, "Registering provider");
                    providers.insert(tag, Arc::clone(&provider));
                }
            }
        }

        Self {
            providers,
            tunnel,
            span: Span::none(),
            _capability: PhantomData,
        }
    }

    /// Scan `dir` for plugin manifests and register what they provide
    pub fn discover(dir: impl AsRef<Path>, linker: &PluginLinker, tunnel: Arc<Tunnel>) -> Result<Self> {
        let catalog = PluginCatalog::scan(dir, linker)?;
        Ok(Self::new(&catalog, tunnel))
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn kind(&self) -> CapabilityKind {
        C::KIND
    }

    /// Every tag some implementation is registered under
    pub fn provides(&self) -> BTreeSet<String> {
        self.providers.keys().cloned().collect()
    }

    /// Provider for `data_source`, tunneled when the data source is remote
    pub fn create(&self, data_source: &DataSourceInfo) -> Result<Arc<C::Provider>> {
        let _entered = self.span.enter();
        let tag = &data_source.data_source_type;

        let provider = self.providers.get(tag).ok_or_else(|| {
            debug!(capability = %C::KIND, %tag, "No provider registered");
            Error::unsupported(tag.as_str())
        })?;

        if data_source.remote {
            data_source.validate_remote()?;
            debug!(capability = %C::KIND, %tag, gateway = %data_source.gateway, "Creating tunneled provider");
            Ok(C::decorate(Arc::clone(provider), Arc::clone(&self.tunnel)))
        } else {
            debug!(capability = %C::KIND, %tag, "Creating provider");
            Ok(Arc::clone(provider))
        }
    }
}

impl<C: Capability> std::fmt::Debug for ProviderRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("capability", &C::KIND)
            .field("tags", &self.provides())
            .finish()
    }
}

/// The four capability registries, built from one catalog
#[derive(Debug)]
pub struct Providers {
    pub graph: ProviderRegistry<GraphQuery>,
    pub index: ProviderRegistry<Indexing>,
    pub metadata: ProviderRegistry<Metadata>,
    pub table: ProviderRegistry<Tabular>,
}

impl Providers {
    pub fn new(catalog: &PluginCatalog, tunnel: Arc<Tunnel>) -> Self {
        Self {
            graph: ProviderRegistry::new(catalog, Arc::clone(&tunnel)),
            index: ProviderRegistry::new(catalog, Arc::clone(&tunnel)),
            metadata: ProviderRegistry::new(catalog, Arc::clone(&tunnel)),
            table: ProviderRegistry::new(catalog, tunnel),
        }
    }

    pub fn discover(dir: impl AsRef<Path>, linker: &PluginLinker, tunnel: Arc<Tunnel>) -> Result<Self> {
        let catalog = PluginCatalog::scan(dir, linker)?;
        Ok(Self::new(&catalog, tunnel))
    }

    #[must_use]
    pub fn with_span(self, span: Span) -> Self {
        Self {
            graph: self.graph.with_span(span.clone()),
            index: self.index.with_span(span.clone()),
            metadata: self.metadata.with_span(span.clone()),
            table: self.table.with_span(span),
        }
    }

    /// Registered tags per capability
    pub fn describe(&self) -> BTreeMap<CapabilityKind, BTreeSet<String>> {
        BTreeMap::from([
            (CapabilityKind::Graph, self.graph.provides()),
            (CapabilityKind::Index, self.index.provides()),
            (CapabilityKind::Metadata, self.metadata.provides()),
            (CapabilityKind::Table, self.table.provides()),
        ])
    }

    pub fn graph(&self, data_source: &DataSourceInfo) -> Result<Arc<dyn GraphDataProvider>> {
        self.graph.create(data_source)
    }

    pub fn index(&self, data_source: &DataSourceInfo) -> Result<Arc<dyn IndexProvider>> {
        self.index.create(data_source)
    }

    pub fn metadata(&self, data_source: &DataSourceInfo) -> Result<Arc<dyn MetadataProvider>> {
        self.metadata.create(data_source)
    }

    pub fn table(&self, data_source: &DataSourceInfo) -> Result<Arc<dyn TableDataProvider>> {
        self.table.create(data_source)
    }
}
