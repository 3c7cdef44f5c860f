//! Canonical graph and data source types

use super::semantic::SemanticType;
use super::value::Value;
use crate::error::{Error, Result};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Data Source
// ============================================================================

/// Default SSH port used when a descriptor does not set one
pub const DEFAULT_SSH_PORT: u16 = 22;

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

/// Connection descriptor for one backend instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceInfo {
    pub id: i64,

    /// Backend type tag, matched against provider registrations
    #[serde(rename = "type")]
    pub data_source_type: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub server: String,

    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub aggregation_enabled: bool,

    /// Backend-specific options, passed through untouched
    #[serde(default)]
    pub connection_properties: BTreeMap<String, String>,

    #[serde(default)]
    pub enable_ssl: bool,

    #[serde(default)]
    pub skip_cert_validation: bool,

    /// Reach the backend through an SSH gateway
    #[serde(default)]
    pub remote: bool,

    #[serde(default)]
    pub gateway: String,

    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// Empty means the configured default user
    #[serde(default)]
    pub ssh_user: String,
}

impl DataSourceInfo {
    /// Create a local data source descriptor
    pub fn new(id: i64, data_source_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            data_source_type: data_source_type.into(),
            name: name.into(),
            description: String::new(),
            server: String::new(),
            port: 0,
            database: String::new(),
            username: String::new(),
            password: String::new(),
            aggregation_enabled: false,
            connection_properties: BTreeMap::new(),
            enable_ssl: false,
            skip_cert_validation: false,
            remote: false,
            gateway: String::new(),
            ssh_port: DEFAULT_SSH_PORT,
            ssh_user: String::new(),
        }
    }

    #[must_use]
    pub fn with_server(mut self, server: impl Into<String>, port: u16) -> Self {
        self.server = server.into();
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.connection_properties.insert(key.into(), value.into());
        self
    }

    /// Mark the data source as reachable only through `gateway`
    #[must_use]
    pub fn with_gateway(
        mut self,
        gateway: impl Into<String>,
        ssh_port: u16,
        ssh_user: impl Into<String>,
    ) -> Self {
        self.remote = true;
        self.gateway = gateway.into();
        self.ssh_port = ssh_port;
        self.ssh_user = ssh_user.into();
        self
    }

    /// Copy of this descriptor pointing at a local forwarded port.
    ///
    /// The copy is never remote, so it cannot be tunneled a second time.
    pub fn to_local(&self, port: u16) -> DataSourceInfo {
        DataSourceInfo {
            server: "localhost".to_string(),
            port,
            remote: false,
            ..self.clone()
        }
    }

    /// Check that a remote descriptor carries enough to open a tunnel
    pub fn validate_remote(&self) -> Result<()> {
        if !self.remote {
            return Ok(());
        }
        if self.gateway.trim().is_empty() {
            return Err(Error::config(format!(
                "Data source '{}' is remote but has no gateway",
                self.name
            )));
        }
        if self.ssh_port == 0 {
            return Err(Error::config(format!(
                "Data source '{}' is remote but has no SSH port",
                self.name
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Graph Elements
// ============================================================================

/// Element group as understood by graph renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    #[serde(rename = "nodes")]
    Nodes,
    #[serde(rename = "edges")]
    Edges,
    #[serde(rename = "unk")]
    Unknown,
}

/// Presentation hint, carried through untouched
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Payload of a graph element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Data {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Edge endpoints; `None` for nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default)]
    pub record: BTreeMap<String, Value>,
}

/// One graph element in renderer-ready shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CytoData {
    /// Class name; several labels are joined with a space
    pub classes: String,
    pub group: Group,
    pub data: Data,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub selected: bool,
    #[serde(default = "default_true")]
    pub selectable: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_true")]
    pub grabbable: bool,
}

fn default_true() -> bool {
    true
}

impl CytoData {
    pub fn new(group: Group, classes: impl Into<String>, data: Data) -> Self {
        Self {
            classes: classes.into(),
            group,
            data,
            position: Position::default(),
            selected: false,
            selectable: true,
            locked: false,
            grabbable: true,
        }
    }

    pub fn node(classes: impl Into<String>, data: Data) -> Self {
        Self::new(Group::Nodes, classes, data)
    }

    pub fn edge(classes: impl Into<String>, data: Data) -> Self {
        Self::new(Group::Edges, classes, data)
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// Individual class labels
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.classes.split_whitespace()
    }
}

/// Insertion-ordered set of elements, unique by element id
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementSet {
    elements: Vec<CytoData>,
    index: BTreeMap<String, usize>,
}

impl ElementSet {
    pub const fn new() -> Self {
        Self {
            elements: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// Insert an element; returns false if one with the same id is present
    pub fn insert(&mut self, element: CytoData) -> bool {
        if self.index.contains_key(element.id()) {
            return false;
        }
        self.index.insert(element.id().to_string(), self.elements.len());
        self.elements.push(element);
        true
    }

    pub fn get(&self, id: &str) -> Option<&CytoData> {
        self.index.get(id).map(|&i| &self.elements[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CytoData> {
        self.elements.iter()
    }
}

impl<'a> IntoIterator for &'a ElementSet {
    type Item = &'a CytoData;
    type IntoIter = std::slice::Iter<'a, CytoData>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl IntoIterator for ElementSet {
    type Item = CytoData;
    type IntoIter = std::vec::IntoIter<CytoData>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl FromIterator<CytoData> for ElementSet {
    fn from_iter<I: IntoIterator<Item = CytoData>>(iter: I) -> Self {
        let mut set = ElementSet::new();
        for element in iter {
            set.insert(element);
        }
        set
    }
}

impl Serialize for ElementSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.elements)
    }
}

impl<'de> Deserialize<'de> for ElementSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let elements = Vec::<CytoData>::deserialize(deserializer)?;
        Ok(elements.into_iter().collect())
    }
}

// ============================================================================
// Graph Data
// ============================================================================

/// Class name -> property name -> semantic type
pub type ClassProperties = BTreeMap<String, BTreeMap<String, SemanticType>>;

/// Record keys every node carries
pub const IN_KEY: &str = "@in";
pub const OUT_KEY: &str = "@out";
pub const EDGE_COUNT_KEY: &str = "@edgeCount";

/// Result envelope of a graph fetch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
    pub nodes_classes: ClassProperties,
    pub edges_classes: ClassProperties,
    pub nodes: ElementSet,
    pub edges: ElementSet,
    pub truncated: bool,
}

impl GraphData {
    /// Shared empty result
    pub const EMPTY: GraphData = GraphData {
        nodes_classes: BTreeMap::new(),
        edges_classes: BTreeMap::new(),
        nodes: ElementSet::new(),
        edges: ElementSet::new(),
        truncated: false,
    };

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Union with another result.
    ///
    /// Elements already present win, class properties already registered
    /// keep their type, and truncation is sticky.
    pub fn merge(&mut self, other: GraphData) {
        merge_classes(&mut self.nodes_classes, other.nodes_classes);
        merge_classes(&mut self.edges_classes, other.edges_classes);
        for node in other.nodes {
            self.nodes.insert(node);
        }
        for edge in other.edges {
            self.edges.insert(edge);
        }
        self.truncated |= other.truncated;
    }

    /// Check the normalization contract: every referenced class is
    /// registered, nodes carry their edge counters, edges their endpoints.
    pub fn is_well_formed(&self) -> bool {
        let nodes_ok = self.nodes.iter().all(|node| {
            node.group == Group::Nodes
                && node.labels().all(|l| self.nodes_classes.contains_key(l))
                && [IN_KEY, OUT_KEY, EDGE_COUNT_KEY]
                    .iter()
                    .all(|k| node.data.record.contains_key(*k))
        });
        let edges_ok = self.edges.iter().all(|edge| {
            edge.group == Group::Edges
                && edge.labels().all(|l| self.edges_classes.contains_key(l))
                && edge.data.source.as_deref().is_some_and(|s| !s.is_empty())
                && edge.data.target.as_deref().is_some_and(|t| !t.is_empty())
        });
        nodes_ok && edges_ok
    }
}

fn merge_classes(into: &mut ClassProperties, from: ClassProperties) {
    for (class, properties) in from {
        let entry = into.entry(class).or_default();
        for (name, semantic) in properties {
            entry.entry(name).or_insert(semantic);
        }
    }
}

// ============================================================================
// Query Inputs
// ============================================================================

/// Traversal direction for expansions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
    #[default]
    Both,
}

impl std::str::FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            "both" => Ok(Direction::Both),
            other => Err(Error::config(format!("Unknown direction: {other}"))),
        }
    }
}

/// Equality filter used by class loads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub property: String,
    pub value: Value,
}

impl PropertyFilter {
    pub fn new(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// A property of a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: SemanticType,
}

/// A class (vertex type, edge type or table) with its cardinality
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeClass {
    pub name: String,
    pub cardinality: u64,
    pub properties: BTreeMap<String, TypeProperty>,
}

impl TypeClass {
    pub fn new(name: impl Into<String>, cardinality: u64) -> Self {
        Self {
            name: name.into(),
            cardinality,
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, property_type: SemanticType) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            TypeProperty {
                name,
                property_type,
            },
        );
        self
    }
}

/// Schema summary of a data source
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceMetadata {
    pub nodes_classes: BTreeMap<String, TypeClass>,
    pub edges_classes: BTreeMap<String, TypeClass>,
}

// ============================================================================
// Tabular Results
// ============================================================================

/// Column of a tabular result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: SemanticType,
}

/// Result of a tabular query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<Column>,
    pub rows: Vec<BTreeMap<String, Value>>,
    pub truncated: bool,
}
