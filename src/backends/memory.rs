//! In-memory graph backend
//!
//! Serves graphs held in memory, keyed by the data source's `database` field.
//! Record ids follow the `#cluster:position` convention, so composite ids go
//! through [`IdScheme::RecordId`].

use crate::error::{Error, Result};
use crate::model::{
    DataSourceInfo, DataSourceMetadata, Direction, GraphAssembler, GraphData, IdScheme,
    NativeEdge, NativeElement, NativeVertex, PropertyFilter, SemanticType, TypeClass,
    TypeProperty, Value,
};
use crate::provider::{tags, DataSourceTypes, GraphDataProvider, IndexProvider, MetadataProvider};
use crate::registry::{PluginManifest, PluginUnit};
use crate::sprite::{offer, Sprite, SpritePlayer};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const FACTORY_NAME: &str = "memory";

/// Data source type tag served by this backend
pub const TAG: &str = "memory";

/// Sprites per `begin`/`end` window during indexing
pub const INDEX_PAGE_SIZE: usize = 100;

/// Query matching every class
pub const ALL_CLASSES: &str = "*";

const ID_SCHEME: IdScheme = IdScheme::RecordId;

// ============================================================================
// Graph
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryVertex {
    pub id: String,
    pub class: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl MemoryVertex {
    pub fn new(id: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEdge {
    pub id: String,
    pub class: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl MemoryEdge {
    pub fn new(
        id: impl Into<String>,
        class: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            from: from.into(),
            to: to.into(),
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// A property graph, in insertion order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryGraph {
    #[serde(default)]
    pub vertices: Vec<MemoryVertex>,
    #[serde(default)]
    pub edges: Vec<MemoryEdge>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_vertex(mut self, vertex: MemoryVertex) -> Self {
        self.vertices.push(vertex);
        self
    }

    #[must_use]
    pub fn with_edge(mut self, edge: MemoryEdge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn vertex(&self, id: &str) -> Option<&MemoryVertex> {
        self.vertices.iter().find(|v| v.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&MemoryEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn vertex_classes(&self) -> BTreeSet<&str> {
        self.vertices.iter().map(|v| v.class.as_str()).collect()
    }

    pub fn edge_classes(&self) -> BTreeSet<&str> {
        self.edges.iter().map(|e| e.class.as_str()).collect()
    }

    fn native_vertex(&self, vertex: &MemoryVertex) -> NativeVertex {
        let mut native = NativeVertex::new(&vertex.id, &vertex.class);
        for (name, value) in &vertex.properties {
            native = native.property(name, value.clone());
        }
        for edge in &self.edges {
            if edge.to == vertex.id {
                native = native.in_edges(&edge.class, 1);
            }
            if edge.from == vertex.id {
                native = native.out_edges(&edge.class, 1);
            }
        }
        native
    }

    fn native_edge(edge: &MemoryEdge) -> NativeEdge {
        let mut native = NativeEdge::new(&edge.id, &edge.class, &edge.from, &edge.to);
        for (name, value) in &edge.properties {
            native = native.property(name, value.clone());
        }
        native
    }

    /// Edges touching `vertex_id` in `direction`, with the vertex at the other end
    fn incident<'a>(
        &'a self,
        vertex_id: &'a str,
        direction: Direction,
        label: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a MemoryEdge, &'a str)> + 'a {
        self.edges
            .iter()
            .filter(move |e| label.map_or(true, |l| e.class == l))
            .filter_map(move |e| {
                let outgoing = e.from == vertex_id && direction != Direction::In;
                let incoming = e.to == vertex_id && direction != Direction::Out;
                if outgoing {
                    Some((e, e.to.as_str()))
                } else if incoming {
                    Some((e, e.from.as_str()))
                } else {
                    None
                }
            })
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Graph, indexing and metadata provider over in-memory datasets
#[derive(Debug, Clone, Default)]
pub struct MemoryGraphProvider {
    datasets: BTreeMap<String, Arc<MemoryGraph>>,
}

impl MemoryGraphProvider {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dataset(mut self, name: impl Into<String>, graph: MemoryGraph) -> Self {
        self.datasets.insert(name.into(), Arc::new(graph));
        self
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    fn dataset(&self, data_source: &DataSourceInfo) -> Result<&MemoryGraph> {
        self.datasets
            .get(&data_source.database)
            .map(Arc::as_ref)
            .ok_or_else(|| Error::not_found(format!("dataset '{}'", data_source.database)))
    }

    fn assembler(data_source: &DataSourceInfo) -> GraphAssembler {
        GraphAssembler::new(data_source.id, ID_SCHEME)
    }
}

impl DataSourceTypes for MemoryGraphProvider {
    fn supported_data_source_types(&self) -> BTreeSet<String> {
        tags([TAG])
    }
}

#[async_trait]
impl GraphDataProvider for MemoryGraphProvider {
    async fn fetch_data(
        &self,
        data_source: &DataSourceInfo,
        query: &str,
        limit: usize,
    ) -> Result<GraphData> {
        let graph = self.dataset(data_source)?;
        let class = query.trim();
        let everything = class.is_empty() || class == ALL_CLASSES;

        if !everything
            && !graph.vertex_classes().contains(class)
            && !graph.edge_classes().contains(class)
        {
            return Err(Error::not_found(format!("class '{class}'")));
        }

        let vertices = graph
            .vertices
            .iter()
            .filter(|v| everything || v.class == class)
            .map(|v| NativeElement::from(graph.native_vertex(v)));
        let edges = graph
            .edges
            .iter()
            .filter(|e| everything || e.class == class)
            .map(|e| NativeElement::from(MemoryGraph::native_edge(e)));

        let mut assembler = Self::assembler(data_source).with_limit(limit);
        assembler.ingest(vertices.chain(edges));
        let data = assembler.finish();

        debug!(
            data_source = %data_source.name,
            query = class,
            nodes = data.nodes.len(),
            edges = data.edges.len(),
            truncated = data.truncated,
            "Fetched graph data"
        );
        Ok(data)
    }

    async fn expand(
        &self,
        data_source: &DataSourceInfo,
        ids: &[String],
        direction: Direction,
        edge_label: Option<&str>,
        max_traversal: usize,
    ) -> Result<GraphData> {
        let graph = self.dataset(data_source)?;
        let start = ID_SCHEME.decode_all(data_source.id, ids)?;

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut frontier: VecDeque<(&str, usize)> = VecDeque::new();
        for id in &start {
            if let Some(vertex) = graph.vertex(id) {
                visited.insert(vertex.id.as_str());
                frontier.push_back((vertex.id.as_str(), 0));
            }
        }

        let mut reached: Vec<&MemoryVertex> = Vec::new();
        let mut traversed: Vec<&MemoryEdge> = Vec::new();
        let mut seen_edges: BTreeSet<&str> = BTreeSet::new();

        while let Some((vertex_id, depth)) = frontier.pop_front() {
            if depth >= max_traversal.max(1) {
                continue;
            }
            for (edge, other) in graph.incident(vertex_id, direction, edge_label) {
                if seen_edges.insert(edge.id.as_str()) {
                    traversed.push(edge);
                }
                if visited.insert(other) {
                    if let Some(vertex) = graph.vertex(other) {
                        reached.push(vertex);
                        frontier.push_back((other, depth + 1));
                    }
                }
            }
        }

        let mut assembler = Self::assembler(data_source);
        for vertex in reached {
            assembler.add_vertex(graph.native_vertex(vertex));
        }
        for edge in traversed {
            assembler.add_edge(MemoryGraph::native_edge(edge));
        }
        Ok(assembler.finish())
    }

    async fn load(&self, data_source: &DataSourceInfo, ids: &[String]) -> Result<GraphData> {
        let graph = self.dataset(data_source)?;
        let mut assembler = Self::assembler(data_source);

        for id in ID_SCHEME.decode_all(data_source.id, ids)? {
            if let Some(vertex) = graph.vertex(&id) {
                assembler.add_vertex(graph.native_vertex(vertex));
            } else if let Some(edge) = graph.edge(&id) {
                assembler.add_edge(MemoryGraph::native_edge(edge));
            }
        }
        Ok(assembler.finish())
    }

    async fn load_from_class(
        &self,
        data_source: &DataSourceInfo,
        class_name: &str,
        filter: Option<&PropertyFilter>,
        limit: usize,
    ) -> Result<GraphData> {
        let graph = self.dataset(data_source)?;
        let keep = |properties: &BTreeMap<String, Value>| {
            filter.map_or(true, |f| properties.get(&f.property) == Some(&f.value))
        };

        let vertices = graph
            .vertices
            .iter()
            .filter(|v| v.class == class_name && keep(&v.properties))
            .map(|v| NativeElement::from(graph.native_vertex(v)));
        let edges = graph
            .edges
            .iter()
            .filter(|e| e.class == class_name && keep(&e.properties))
            .map(|e| NativeElement::from(MemoryGraph::native_edge(e)));

        let mut assembler = Self::assembler(data_source).with_limit(limit);
        assembler.ingest(vertices.chain(edges));
        Ok(assembler.finish())
    }

    async fn edges(
        &self,
        data_source: &DataSourceInfo,
        from_ids: &[String],
        labels: &[String],
        to_ids: &[String],
    ) -> Result<GraphData> {
        let graph = self.dataset(data_source)?;
        let from: BTreeSet<String> = ID_SCHEME.decode_all(data_source.id, from_ids)?.into_iter().collect();
        let to: BTreeSet<String> = ID_SCHEME.decode_all(data_source.id, to_ids)?.into_iter().collect();

        let mut assembler = Self::assembler(data_source);
        for edge in &graph.edges {
            let label_ok = labels.is_empty() || labels.contains(&edge.class);
            let to_ok = to.is_empty() || to.contains(&edge.to);
            if label_ok && from.contains(&edge.from) && to_ok {
                assembler.add_edge(MemoryGraph::native_edge(edge));
            }
        }
        Ok(assembler.finish())
    }

    async fn test_connection(&self, data_source: &DataSourceInfo) -> Result<()> {
        self.dataset(data_source).map(|_| ())
    }
}

#[async_trait]
impl IndexProvider for MemoryGraphProvider {
    async fn provide_to(
        &self,
        data_source: &DataSourceInfo,
        player: &mut dyn SpritePlayer,
    ) -> Result<()> {
        let graph = self.dataset(data_source)?;

        for class in graph.vertex_classes() {
            let vertices: Vec<&MemoryVertex> =
                graph.vertices.iter().filter(|v| v.class == class).collect();
            for page in vertices.chunks(INDEX_PAGE_SIZE) {
                player.begin()?;
                for vertex in page {
                    let mut sprite = Sprite::new();
                    sprite
                        .add("@id", ID_SCHEME.encode(data_source.id, &vertex.id))
                        .add("@class", vertex.class.as_str())
                        .load(vertex.properties.clone());
                    offer(player, sprite)?;
                }
                player.end()?;
            }
        }

        for class in graph.edge_classes() {
            let edges: Vec<&MemoryEdge> = graph.edges.iter().filter(|e| e.class == class).collect();
            for page in edges.chunks(INDEX_PAGE_SIZE) {
                player.begin()?;
                for edge in page {
                    let mut sprite = Sprite::new();
                    sprite
                        .add("@id", ID_SCHEME.encode(data_source.id, &edge.id))
                        .add("@class", edge.class.as_str())
                        .add("@source", ID_SCHEME.encode(data_source.id, &edge.from))
                        .add("@target", ID_SCHEME.encode(data_source.id, &edge.to))
                        .load(edge.properties.clone());
                    offer(player, sprite)?;
                }
                player.end()?;
            }
        }

        info!(data_source = %data_source.name, processed = player.processed(), "Indexing complete");
        Ok(())
    }
}

#[async_trait]
impl MetadataProvider for MemoryGraphProvider {
    async fn fetch_metadata(&self, data_source: &DataSourceInfo) -> Result<DataSourceMetadata> {
        let graph = self.dataset(data_source)?;
        let mut metadata = DataSourceMetadata::default();

        for vertex in &graph.vertices {
            describe(&mut metadata.nodes_classes, &vertex.class, &vertex.properties);
        }
        for edge in &graph.edges {
            describe(&mut metadata.edges_classes, &edge.class, &edge.properties);
        }
        Ok(metadata)
    }
}

fn describe(
    classes: &mut BTreeMap<String, TypeClass>,
    class: &str,
    properties: &BTreeMap<String, Value>,
) {
    let entry = classes
        .entry(class.to_string())
        .or_insert_with(|| TypeClass::new(class, 0));
    entry.cardinality += 1;
    for (name, value) in properties {
        if value.is_scalar() && !entry.properties.contains_key(name) {
            entry.properties.insert(
                name.clone(),
                TypeProperty {
                    name: name.clone(),
                    property_type: SemanticType::of(value),
                },
            );
        }
    }
}

// ============================================================================
// Plugin
// ============================================================================

/// Links a `memory` manifest.
///
/// `settings.datasets` maps dataset names to JSON graph files, resolved
/// against the manifest directory.
pub fn factory(manifest: &PluginManifest) -> Result<PluginUnit> {
    let mut provider = MemoryGraphProvider::new();

    if let Some(datasets) = manifest.setting("datasets") {
        let datasets: BTreeMap<String, PathBuf> = serde_yaml::from_value(datasets.clone())
            .map_err(|e| {
                Error::config(format!(
                    "Plugin '{}': settings.datasets must map names to files: {e}",
                    manifest.name
                ))
            })?;

        for (name, path) in datasets {
            let path = manifest.resolve_path(&path);
            let graph = MemoryGraph::from_json_file(&path).map_err(|e| {
                Error::config(format!("Plugin '{}': cannot load {}: {e}", manifest.name, path.display()))
            })?;
            debug!(plugin = %manifest.name, dataset = %name, vertices = graph.vertices.len(), edges = graph.edges.len(), "Dataset loaded");
            provider = provider.with_dataset(name, graph);
        }
    }

    debug!(plugin = %manifest.name, datasets = ?provider.dataset_names().collect::<Vec<_>>(), "Memory plugin linked");
    let provider = Arc::new(provider);
    Ok(PluginUnit::new(&manifest.name)
        .with_graph(provider.clone())
        .with_index(provider.clone())
        .with_metadata(provider))
}
