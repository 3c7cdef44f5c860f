//! Capability implementations routed through a tunnel

use super::scope::Tunnel;
use crate::error::Result;
use crate::model::{
    DataSourceInfo, DataSourceMetadata, Direction, GraphData, PropertyFilter, TableData, Value,
};
use crate::provider::{
    DataSourceTypes, GraphDataProvider, IndexProvider, MetadataProvider, TableDataProvider,
};
use crate::sprite::SpritePlayer;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Wraps a provider so that every call on a remote data source runs inside
/// its own tunnel
pub struct Tunneled<P: ?Sized> {
    inner: Arc<P>,
    tunnel: Arc<Tunnel>,
}

impl<P: ?Sized> Tunneled<P> {
    pub fn new(inner: Arc<P>, tunnel: Arc<Tunnel>) -> Self {
        Self { inner, tunnel }
    }

    pub fn inner(&self) -> &Arc<P> {
        &self.inner
    }
}

impl<P: DataSourceTypes + ?Sized> DataSourceTypes for Tunneled<P> {
    fn supported_data_source_types(&self) -> BTreeSet<String> {
        self.inner.supported_data_source_types()
    }
}

#[async_trait]
impl<P: GraphDataProvider + ?Sized> GraphDataProvider for Tunneled<P> {
    async fn fetch_data(
        &self,
        data_source: &DataSourceInfo,
        query: &str,
        limit: usize,
    ) -> Result<GraphData> {
        let inner = &self.inner;
        self.tunnel
            .scoped(data_source, |local| async move {
                GraphDataProvider::fetch_data(&**inner, &local, query, limit).await
            })
            .await
    }

    async fn expand(
        &self,
        data_source: &DataSourceInfo,
        ids: &[String],
        direction: Direction,
        edge_label: Option<&str>,
        max_traversal: usize,
    ) -> Result<GraphData> {
        let inner = &self.inner;
        self.tunnel
            .scoped(data_source, |local| async move {
                inner
                    .expand(&local, ids, direction, edge_label, max_traversal)
                    .await
            })
            .await
    }

    async fn load(&self, data_source: &DataSourceInfo, ids: &[String]) -> Result<GraphData> {
        let inner = &self.inner;
        self.tunnel
            .scoped(data_source, |local| async move { inner.load(&local, ids).await })
            .await
    }

    async fn load_from_class(
        &self,
        data_source: &DataSourceInfo,
        class_name: &str,
        filter: Option<&PropertyFilter>,
        limit: usize,
    ) -> Result<GraphData> {
        let inner = &self.inner;
        self.tunnel
            .scoped(data_source, |local| async move {
                inner.load_from_class(&local, class_name, filter, limit).await
            })
            .await
    }

    async fn edges(
        &self,
        data_source: &DataSourceInfo,
        from_ids: &[String],
        labels: &[String],
        to_ids: &[String],
    ) -> Result<GraphData> {
        let inner = &self.inner;
        self.tunnel
            .scoped(data_source, |local| async move {
                inner.edges(&local, from_ids, labels, to_ids).await
            })
            .await
    }

    async fn test_connection(&self, data_source: &DataSourceInfo) -> Result<()> {
        let inner = &self.inner;
        self.tunnel
            .scoped(data_source, |local| async move {
                inner.test_connection(&local).await
            })
            .await
    }
}

#[async_trait]
impl<P: IndexProvider + ?Sized> IndexProvider for Tunneled<P> {
    async fn provide_to(
        &self,
        data_source: &DataSourceInfo,
        player: &mut dyn SpritePlayer,
    ) -> Result<()> {
        let inner = &self.inner;
        self.tunnel
            .scoped(data_source, |local| async move {
                inner.provide_to(&local, player).await
            })
            .await
    }
}

#[async_trait]
impl<P: MetadataProvider + ?Sized> MetadataProvider for Tunneled<P> {
    async fn fetch_metadata(&self, data_source: &DataSourceInfo) -> Result<DataSourceMetadata> {
        let inner = &self.inner;
        self.tunnel
            .scoped(data_source, |local| async move {
                inner.fetch_metadata(&local).await
            })
            .await
    }
}

#[async_trait]
impl<P: TableDataProvider + ?Sized> TableDataProvider for Tunneled<P> {
    async fn fetch_data(
        &self,
        data_source: &DataSourceInfo,
        query: &str,
        params: &[Value],
        limit: usize,
    ) -> Result<TableData> {
        let inner = &self.inner;
        self.tunnel
            .scoped(data_source, |local| async move {
                TableDataProvider::fetch_data(&**inner, &local, query, params, limit).await
            })
            .await
    }
}
