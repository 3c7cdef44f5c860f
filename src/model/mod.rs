//! Canonical graph model
//!
//! The shape every backend adapter produces, whatever it talks to:
//!
//! - [`DataSourceInfo`] - connection descriptor
//! - [`GraphData`] / [`CytoData`] / [`Data`] - fetched graph elements
//! - [`Value`] - tagged property values
//! - [`SemanticType`] / [`map_type`] - normalized property types
//! - [`IdScheme`] - composite id encoding
//! - [`GraphAssembler`] - applies the normalization rules

mod assembly;
mod ids;
mod semantic;
mod types;
mod value;

pub use assembly::{
    ClassRegistry, GraphAssembler, NativeEdge, NativeElement, NativeProperty, NativeVertex,
};
pub use ids::IdScheme;
pub use semantic::{map_type, SemanticType};
pub use types::{
    ClassProperties, Column, CytoData, Data, DataSourceInfo, DataSourceMetadata, Direction,
    ElementSet, GraphData, Group, Position, PropertyFilter, TableData, TypeClass, TypeProperty,
    DEFAULT_SSH_PORT, EDGE_COUNT_KEY, IN_KEY, OUT_KEY,
};
pub use value::{FromValue, Value};
