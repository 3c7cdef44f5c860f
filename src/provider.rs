//! Backend capability contracts
//!
//! A backend implements one or more of these traits and advertises the data
//! source type tags it understands. The registry hands out implementations
//! by tag, wrapped in an SSH tunnel when the data source is remote.
//!
//! Every method receives the [`DataSourceInfo`] to talk to. Behind a tunnel
//! that descriptor is the local, rewritten copy, never the original.

use crate::error::Result;
use crate::model::{
    DataSourceInfo, DataSourceMetadata, Direction, GraphData, PropertyFilter, TableData, Value,
};
use crate::sprite::SpritePlayer;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Declares which data source type tags an implementation serves
pub trait DataSourceTypes: Send + Sync {
    fn supported_data_source_types(&self) -> BTreeSet<String>;
}

/// Graph query capability
#[async_trait]
pub trait GraphDataProvider: DataSourceTypes {
    /// Run a backend-native query, returning at most `limit` nodes and at
    /// most `limit` edges. A limit of 0 means no limit. `truncated` is set
    /// only when elements were left out because of the limit.
    async fn fetch_data(
        &self,
        data_source: &DataSourceInfo,
        query: &str,
        limit: usize,
    ) -> Result<GraphData>;

    /// Walk up to `max_traversal` hops from the given elements
    async fn expand(
        &self,
        data_source: &DataSourceInfo,
        ids: &[String],
        direction: Direction,
        edge_label: Option<&str>,
        max_traversal: usize,
    ) -> Result<GraphData>;

    /// Load elements by composite id
    async fn load(&self, data_source: &DataSourceInfo, ids: &[String]) -> Result<GraphData>;

    /// Load the elements of a class, optionally matching a property value.
    /// `limit` works as in [`GraphDataProvider::fetch_data`].
    async fn load_from_class(
        &self,
        data_source: &DataSourceInfo,
        class_name: &str,
        filter: Option<&PropertyFilter>,
        limit: usize,
    ) -> Result<GraphData>;

    /// Edges from `from_ids` to `to_ids`, restricted to `labels` when non-empty
    async fn edges(
        &self,
        data_source: &DataSourceInfo,
        from_ids: &[String],
        labels: &[String],
        to_ids: &[String],
    ) -> Result<GraphData>;

    async fn test_connection(&self, data_source: &DataSourceInfo) -> Result<()>;
}

/// Bulk indexing capability
#[async_trait]
pub trait IndexProvider: DataSourceTypes {
    /// Push every element of the data source into `player`
    async fn provide_to(
        &self,
        data_source: &DataSourceInfo,
        player: &mut dyn SpritePlayer,
    ) -> Result<()>;
}

/// Schema metadata capability
#[async_trait]
pub trait MetadataProvider: DataSourceTypes {
    async fn fetch_metadata(&self, data_source: &DataSourceInfo) -> Result<DataSourceMetadata>;
}

/// Tabular query capability
#[async_trait]
pub trait TableDataProvider: DataSourceTypes {
    /// Run a query with positional `params`, returning at most `limit` rows.
    /// A limit of 0 means no limit. `truncated` is set only when rows were
    /// left out because of the limit.
    async fn fetch_data(
        &self,
        data_source: &DataSourceInfo,
        query: &str,
        params: &[Value],
        limit: usize,
    ) -> Result<TableData>;
}

/// Build a tag set from string literals
pub fn tags<const N: usize>(names: [&str; N]) -> BTreeSet<String> {
    names.iter().map(ToString::to_string).collect()
}
