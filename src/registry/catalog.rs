//! Plugin units, manifests and discovery
//!
//! A plugin directory holds one YAML manifest per unit:
//!
//! ```yaml
//! name: social
//! factory: memory          # defaults to name
//! enabled: true            # defaults to true
//! capabilities: [graph, metadata]   # optional allow-list
//! settings:
//!   datasets:
//!     social: social.json
//! ```
//!
//! Manifests are linked against a static factory table, so units can be added
//! or switched off by dropping files into the directory without recompiling.

use super::capability::CapabilityKind;
use crate::backends;
use crate::error::{Error, Result, ResultExt};
use crate::provider::{GraphDataProvider, IndexProvider, MetadataProvider, TableDataProvider};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================================
// Plugin Unit
// ============================================================================

/// Named bundle of capability implementations
#[derive(Clone, Default)]
pub struct PluginUnit {
    name: String,
    graph: Vec<Arc<dyn GraphDataProvider>>,
    index: Vec<Arc<dyn IndexProvider>>,
    metadata: Vec<Arc<dyn MetadataProvider>>,
    table: Vec<Arc<dyn TableDataProvider>>,
}

impl std::fmt::Debug for PluginUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginUnit")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl PluginUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_graph(mut self, provider: Arc<dyn GraphDataProvider>) -> Self {
        self.graph.push(provider);
        self
    }

    #[must_use]
    pub fn with_index(mut self, provider: Arc<dyn IndexProvider>) -> Self {
        self.index.push(provider);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata.push(provider);
        self
    }

    #[must_use]
    pub fn with_table(mut self, provider: Arc<dyn TableDataProvider>) -> Self {
        self.table.push(provider);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph_providers(&self) -> &[Arc<dyn GraphDataProvider>] {
        &self.graph
    }

    pub fn index_providers(&self) -> &[Arc<dyn IndexProvider>] {
        &self.index
    }

    pub fn metadata_providers(&self) -> &[Arc<dyn MetadataProvider>] {
        &self.metadata
    }

    pub fn table_providers(&self) -> &[Arc<dyn TableDataProvider>] {
        &self.table
    }

    /// Capabilities this unit has at least one implementation for
    pub fn capabilities(&self) -> BTreeSet<CapabilityKind> {
        let mut kinds = BTreeSet::new();
        if !self.graph.is_empty() {
            kinds.insert(CapabilityKind::Graph);
        }
        if !self.index.is_empty() {
            kinds.insert(CapabilityKind::Index);
        }
        if !self.metadata.is_empty() {
            kinds.insert(CapabilityKind::Metadata);
        }
        if !self.table.is_empty() {
            kinds.insert(CapabilityKind::Table);
        }
        kinds
    }

    /// Drop every capability not in `allowed`
    pub fn restrict(&mut self, allowed: &BTreeSet<CapabilityKind>) {
        if !allowed.contains(&CapabilityKind::Graph) {
            self.graph.clear();
        }
        if !allowed.contains(&CapabilityKind::Index) {
            self.index.clear();
        }
        if !allowed.contains(&CapabilityKind::Metadata) {
            self.metadata.clear();
        }
        if !allowed.contains(&CapabilityKind::Table) {
            self.table.clear();
        }
    }
}

// ============================================================================
// Manifest
// ============================================================================

fn default_true() -> bool {
    true
}

/// Plugin manifest as found in a plugin directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,

    /// Factory to link against; defaults to `name`
    #[serde(default)]
    pub factory: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Only expose these capabilities; all when absent
    #[serde(default)]
    pub capabilities: Option<BTreeSet<CapabilityKind>>,

    /// Factory-specific settings
    #[serde(default)]
    pub settings: BTreeMap<String, serde_yaml::Value>,

    /// Directory the manifest was read from; relative paths in settings
    /// resolve against it
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl PluginManifest {
    /// Manifest for a factory with default settings
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factory: None,
            enabled: true,
            capabilities: None,
            settings: BTreeMap::new(),
            base_dir: PathBuf::new(),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let mut manifest: Self = serde_yaml::from_str(&content)
            .map_err(|e| Error::config(format!("Invalid manifest {}: {e}", path.display())))?;
        manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(manifest)
    }

    pub fn factory_name(&self) -> &str {
        self.factory.as_deref().unwrap_or(&self.name)
    }

    pub fn setting(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.settings.get(key)
    }

    /// Resolve a path-valued setting against the manifest directory
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

// ============================================================================
// Linker
// ============================================================================

/// Builds a unit from its manifest
pub type PluginFactory = fn(&PluginManifest) -> Result<PluginUnit>;

/// Static table of plugin factories, keyed by factory name
#[derive(Debug, Clone, Default)]
pub struct PluginLinker {
    factories: BTreeMap<String, PluginFactory>,
}

impl PluginLinker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Linker knowing the backends compiled into this crate
    pub fn builtin() -> Self {
        Self::new()
            .register(backends::memory::FACTORY_NAME, backends::memory::factory)
            .register(backends::relational::FACTORY_NAME, backends::relational::factory)
    }

    #[must_use]
    pub fn register(mut self, name: impl Into<String>, factory: PluginFactory) -> Self {
        self.factories.insert(name.into(), factory);
        self
    }

    pub fn factory_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build the unit a manifest describes, honoring its capability allow-list
    pub fn link(&self, manifest: &PluginManifest) -> Result<PluginUnit> {
        let factory_name = manifest.factory_name();
        let factory = self.factories.get(factory_name).ok_or_else(|| {
            Error::config(format!(
                "Plugin '{}' names unknown factory '{}'",
                manifest.name, factory_name
            ))
        })?;

        let mut unit = factory(manifest)?;
        unit.name = manifest.name.clone();
        if let Some(allowed) = &manifest.capabilities {
            unit.restrict(allowed);
        }
        Ok(unit)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Ordered set of discovered plugin units
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    units: Vec<PluginUnit>,
}

impl PluginCatalog {
    pub fn new(units: Vec<PluginUnit>) -> Self {
        Self { units }
    }

    /// One unit per builtin factory, default settings
    pub fn builtin() -> Result<Self> {
        let linker = PluginLinker::builtin();
        let units = linker
            .factory_names()
            .map(|name| linker.link(&PluginManifest::named(name)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { units })
    }

    /// Read every `*.yaml` / `*.yml` manifest in `dir`, in file name order
    pub fn scan(dir: impl AsRef<Path>, linker: &PluginLinker) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::config(format!(
                "Plugin directory not found: {}",
                dir.display()
            )));
        }

        let mut paths = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect::<Vec<_>>();
        paths.sort();

        let mut units = Vec::with_capacity(paths.len());
        for path in paths {
            let manifest = PluginManifest::from_file(&path)?;
            if !manifest.enabled {
                debug!(plugin = %manifest.name, "Plugin disabled, skipping");
                continue;
            }
            let unit = linker.link(&manifest)?;
            debug!(
                plugin = %unit.name(),
                factory = %manifest.factory_name(),
                capabilities = ?unit.capabilities(),
                "Plugin linked"
            );
            units.push(unit);
        }

        info!(dir = %dir.display(), plugins = units.len(), "Plugin discovery complete");
        Ok(Self { units })
    }

    pub fn push(&mut self, unit: PluginUnit) {
        self.units.push(unit);
    }

    pub fn units(&self) -> &[PluginUnit] {
        &self.units
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
