//! Building [`GraphData`] from backend-native elements
//!
//! Adapters describe what their cursor returned as [`NativeVertex`] and
//! [`NativeEdge`] values and let [`GraphAssembler`] apply the normalization
//! rules: composite ids, edge counters on every node, first-write-wins class
//! registries and limit-driven truncation.

use super::ids::IdScheme;
use super::semantic::{map_type, SemanticType};
use super::types::{
    ClassProperties, CytoData, Data, GraphData, EDGE_COUNT_KEY, IN_KEY, OUT_KEY,
};
use super::value::Value;
use std::collections::BTreeMap;

// ============================================================================
// Class Registry
// ============================================================================

/// Class -> property -> type map where the first type seen sticks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassRegistry {
    classes: ClassProperties,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a class has an entry, even without properties
    pub fn ensure_class(&mut self, class: &str) {
        if !self.classes.contains_key(class) {
            self.classes.insert(class.to_string(), BTreeMap::new());
        }
    }

    /// Record a property type; returns false if the property was already known
    pub fn register(&mut self, class: &str, property: &str, semantic: SemanticType) -> bool {
        self.ensure_class(class);
        let properties = self.classes.entry(class.to_string()).or_default();
        if properties.contains_key(property) {
            return false;
        }
        properties.insert(property.to_string(), semantic);
        true
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn property_type(&self, class: &str, property: &str) -> Option<&SemanticType> {
        self.classes.get(class).and_then(|p| p.get(property))
    }

    pub fn into_inner(self) -> ClassProperties {
        self.classes
    }
}

// ============================================================================
// Native Elements
// ============================================================================

/// A property as reported by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct NativeProperty {
    pub name: String,
    pub value: Value,
    /// Declared backend type name, if the backend has one
    pub native_type: Option<String>,
    /// Reference to another record; never part of the record or schema
    pub link: bool,
}

impl NativeProperty {
    fn is_bookkeeping(&self) -> bool {
        self.link || self.name.starts_with("in_") || self.name.starts_with("out_")
    }

    fn semantic_type(&self) -> Option<SemanticType> {
        match &self.native_type {
            Some(native) => Some(map_type(native)),
            None if self.value.is_scalar() => Some(SemanticType::of(&self.value)),
            None => None,
        }
    }
}

fn push_property(
    properties: &mut Vec<NativeProperty>,
    name: impl Into<String>,
    value: impl Into<Value>,
    native_type: Option<String>,
    link: bool,
) {
    properties.push(NativeProperty {
        name: name.into(),
        value: value.into(),
        native_type,
        link,
    });
}

/// A vertex-like element read from a backend cursor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NativeVertex {
    pub id: String,
    pub labels: Vec<String>,
    pub properties: Vec<NativeProperty>,
    /// Incoming edge counts by label
    pub in_edges: BTreeMap<String, u64>,
    /// Outgoing edge counts by label
    pub out_edges: BTreeMap<String, u64>,
}

impl NativeVertex {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            labels: vec![label.into()],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        push_property(&mut self.properties, name, value, None, false);
        self
    }

    #[must_use]
    pub fn typed_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        native_type: impl Into<String>,
    ) -> Self {
        push_property(&mut self.properties, name, value, Some(native_type.into()), false);
        self
    }

    #[must_use]
    pub fn link(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        push_property(&mut self.properties, name, value, None, true);
        self
    }

    #[must_use]
    pub fn in_edges(mut self, label: impl Into<String>, count: u64) -> Self {
        *self.in_edges.entry(label.into()).or_insert(0) += count;
        self
    }

    #[must_use]
    pub fn out_edges(mut self, label: impl Into<String>, count: u64) -> Self {
        *self.out_edges.entry(label.into()).or_insert(0) += count;
        self
    }
}

/// An edge read from a backend cursor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NativeEdge {
    pub id: String,
    pub label: String,
    pub from: String,
    pub to: String,
    pub properties: Vec<NativeProperty>,
}

impl NativeEdge {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            from: from.into(),
            to: to.into(),
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        push_property(&mut self.properties, name, value, None, false);
        self
    }

    #[must_use]
    pub fn typed_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        native_type: impl Into<String>,
    ) -> Self {
        push_property(&mut self.properties, name, value, Some(native_type.into()), false);
        self
    }
}

/// Anything a graph cursor can yield
#[derive(Debug, Clone, PartialEq)]
pub enum NativeElement {
    Vertex(NativeVertex),
    Edge(NativeEdge),
}

impl From<NativeVertex> for NativeElement {
    fn from(v: NativeVertex) -> Self {
        NativeElement::Vertex(v)
    }
}

impl From<NativeEdge> for NativeElement {
    fn from(e: NativeEdge) -> Self {
        NativeElement::Edge(e)
    }
}

// ============================================================================
// Assembler
// ============================================================================

/// Per-fetch builder of a [`GraphData`] result
#[derive(Debug)]
pub struct GraphAssembler {
    data_source_id: i64,
    scheme: IdScheme,
    limit: Option<usize>,
    result: GraphData,
    nodes_classes: ClassRegistry,
    edges_classes: ClassRegistry,
}

impl GraphAssembler {
    pub fn new(data_source_id: i64, scheme: IdScheme) -> Self {
        Self {
            data_source_id,
            scheme,
            limit: None,
            result: GraphData::default(),
            nodes_classes: ClassRegistry::new(),
            edges_classes: ClassRegistry::new(),
        }
    }

    /// Cap the number of nodes and of edges; 0 leaves them uncapped
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn encode(&self, native_id: &str) -> String {
        self.scheme.encode(self.data_source_id, native_id)
    }

    /// Whether either the node or the edge budget is used up
    pub fn is_full(&self) -> bool {
        self.limit
            .is_some_and(|l| self.result.nodes.len() >= l || self.result.edges.len() >= l)
    }

    /// Flag the result as cut short
    pub fn truncate(&mut self) {
        self.result.truncated = true;
    }

    pub fn add_vertex(&mut self, vertex: NativeVertex) -> bool {
        for label in &vertex.labels {
            self.nodes_classes.ensure_class(label);
        }

        let mut record = BTreeMap::new();
        for property in vertex.properties {
            if property.is_bookkeeping() {
                continue;
            }
            if let Some(semantic) = property.semantic_type() {
                for label in &vertex.labels {
                    self.nodes_classes.register(label, &property.name, semantic.clone());
                }
            }
            record.insert(property.name, property.value);
        }

        let edge_count: u64 = vertex.in_edges.values().chain(vertex.out_edges.values()).sum();
        record.insert(IN_KEY.to_string(), counts_to_value(vertex.in_edges));
        record.insert(OUT_KEY.to_string(), counts_to_value(vertex.out_edges));
        record.insert(EDGE_COUNT_KEY.to_string(), Value::from(edge_count));

        let data = Data {
            id: self.encode(&vertex.id),
            record,
            ..Data::default()
        };
        self.result.nodes.insert(CytoData::node(vertex.labels.join(" "), data))
    }

    pub fn add_edge(&mut self, edge: NativeEdge) -> bool {
        self.edges_classes.ensure_class(&edge.label);

        let mut record = BTreeMap::new();
        for property in edge.properties {
            if property.is_bookkeeping() {
                continue;
            }
            if let Some(semantic) = property.semantic_type() {
                self.edges_classes.register(&edge.label, &property.name, semantic);
            }
            record.insert(property.name, property.value);
        }

        let data = Data {
            id: self.encode(&edge.id),
            parent: None,
            source: Some(self.encode(&edge.from)),
            target: Some(self.encode(&edge.to)),
            record,
        };
        self.result.edges.insert(CytoData::edge(edge.label, data))
    }

    pub fn add(&mut self, element: NativeElement) -> bool {
        match element {
            NativeElement::Vertex(v) => self.add_vertex(v),
            NativeElement::Edge(e) => self.add_edge(e),
        }
    }

    /// Drain a cursor until it ends or the limit is hit.
    ///
    /// Hitting the limit with elements still pending marks the result as
    /// truncated; a cursor that ends exactly at the limit does not.
    pub fn ingest<I>(&mut self, elements: I)
    where
        I: IntoIterator<Item = NativeElement>,
    {
        let mut cursor = elements.into_iter().peekable();
        while cursor.peek().is_some() {
            if self.is_full() {
                self.truncate();
                break;
            }
            if let Some(element) = cursor.next() {
                self.add(element);
            }
        }
    }

    pub fn finish(self) -> GraphData {
        GraphData {
            nodes_classes: self.nodes_classes.into_inner(),
            edges_classes: self.edges_classes.into_inner(),
            ..self.result
        }
    }
}

fn counts_to_value(counts: BTreeMap<String, u64>) -> Value {
    Value::Map(
        counts
            .into_iter()
            .map(|(label, count)| (label, Value::from(count)))
            .collect(),
    )
}
