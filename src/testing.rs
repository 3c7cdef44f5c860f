//! In-process fakes shared by unit tests

use crate::error::{Error, Result};
use crate::model::{
    Column, DataSourceInfo, DataSourceMetadata, Direction, GraphData, PropertyFilter,
    SemanticType, TableData, TypeClass, Value,
};
use crate::provider::{
    DataSourceTypes, GraphDataProvider, IndexProvider, MetadataProvider, TableDataProvider,
};
use crate::sprite::{Sprite, SpritePlayer};
use crate::tunnel::{SshConnector, SshSession, SshTarget};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

// ============================================================================
// SSH
// ============================================================================

#[derive(Debug, Default)]
pub struct SessionLog {
    pub connects: Vec<SshTarget>,
    pub forwards: Vec<(u16, String, u16)>,
    pub disconnects: usize,
}

/// Connector that records what a tunnel asks of it
#[derive(Clone, Default)]
pub struct FakeConnector {
    pub log: Arc<Mutex<SessionLog>>,
    pub fail_connect: bool,
    pub fail_forward: bool,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_connect() -> Self {
        Self {
            fail_connect: true,
            ..Self::default()
        }
    }

    pub fn failing_forward() -> Self {
        Self {
            fail_forward: true,
            ..Self::default()
        }
    }

    pub fn connects(&self) -> usize {
        self.log.lock().unwrap().connects.len()
    }

    pub fn disconnects(&self) -> usize {
        self.log.lock().unwrap().disconnects
    }

    pub fn forwards(&self) -> Vec<(u16, String, u16)> {
        self.log.lock().unwrap().forwards.clone()
    }
}

#[async_trait]
impl SshConnector for FakeConnector {
    async fn connect(&self, target: &SshTarget) -> Result<Box<dyn SshSession>> {
        if self.fail_connect {
            return Err(Error::tunnel(format!("cannot reach {}", target.gateway)));
        }
        self.log.lock().unwrap().connects.push(target.clone());
        Ok(Box::new(FakeSession {
            log: Arc::clone(&self.log),
            fail_forward: self.fail_forward,
        }))
    }
}

struct FakeSession {
    log: Arc<Mutex<SessionLog>>,
    fail_forward: bool,
}

#[async_trait]
impl SshSession for FakeSession {
    async fn forward_local(
        &mut self,
        local_port: u16,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<()> {
        if self.fail_forward {
            return Err(Error::tunnel("forward refused"));
        }
        self.log
            .lock()
            .unwrap()
            .forwards
            .push((local_port, remote_host.to_string(), remote_port));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.log.lock().unwrap().disconnects += 1;
    }
}

// ============================================================================
// Providers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    #[default]
    Succeed,
    Fail,
    Panic,
}

/// Provider implementing every capability, remembering the descriptors it saw
#[derive(Default)]
pub struct RecordingProvider {
    pub name: String,
    pub tags: BTreeSet<String>,
    pub behavior: Behavior,
    pub seen: Mutex<Vec<DataSourceInfo>>,
}

impl RecordingProvider {
    pub fn new(name: &str, tags: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            tags: tags.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn last_seen(&self) -> Option<DataSourceInfo> {
        self.seen.lock().unwrap().last().cloned()
    }

    fn observe(&self, data_source: &DataSourceInfo) -> Result<()> {
        self.seen.lock().unwrap().push(data_source.clone());
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(Error::backend_with(
                format!("{} failed", self.name),
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
            )),
            Behavior::Panic => panic!("{} panicked", self.name),
        }
    }
}

impl DataSourceTypes for RecordingProvider {
    fn supported_data_source_types(&self) -> BTreeSet<String> {
        self.tags.clone()
    }
}

#[async_trait]
impl GraphDataProvider for RecordingProvider {
    async fn fetch_data(
        &self,
        data_source: &DataSourceInfo,
        _query: &str,
        _limit: usize,
    ) -> Result<GraphData> {
        self.observe(data_source)?;
        Ok(GraphData::EMPTY)
    }

    async fn expand(
        &self,
        data_source: &DataSourceInfo,
        _ids: &[String],
        _direction: Direction,
        _edge_label: Option<&str>,
        _max_traversal: usize,
    ) -> Result<GraphData> {
        self.observe(data_source)?;
        Ok(GraphData::EMPTY)
    }

    async fn load(&self, data_source: &DataSourceInfo, _ids: &[String]) -> Result<GraphData> {
        self.observe(data_source)?;
        Ok(GraphData::EMPTY)
    }

    async fn load_from_class(
        &self,
        data_source: &DataSourceInfo,
        _class_name: &str,
        _filter: Option<&PropertyFilter>,
        _limit: usize,
    ) -> Result<GraphData> {
        self.observe(data_source)?;
        Ok(GraphData::EMPTY)
    }

    async fn edges(
        &self,
        data_source: &DataSourceInfo,
        _from_ids: &[String],
        _labels: &[String],
        _to_ids: &[String],
    ) -> Result<GraphData> {
        self.observe(data_source)?;
        Ok(GraphData::EMPTY)
    }

    async fn test_connection(&self, data_source: &DataSourceInfo) -> Result<()> {
        self.observe(data_source)
    }
}

#[async_trait]
impl IndexProvider for RecordingProvider {
    async fn provide_to(
        &self,
        data_source: &DataSourceInfo,
        player: &mut dyn SpritePlayer,
    ) -> Result<()> {
        self.observe(data_source)?;
        player.begin()?;
        player.play(Sprite::new().with("@provider", self.name.as_str()))?;
        player.end()
    }
}

#[async_trait]
impl MetadataProvider for RecordingProvider {
    async fn fetch_metadata(&self, data_source: &DataSourceInfo) -> Result<DataSourceMetadata> {
        self.observe(data_source)?;
        let mut metadata = DataSourceMetadata::default();
        metadata.nodes_classes.insert(
            self.name.clone(),
            TypeClass::new(&self.name, 1).with_property("id", SemanticType::Numeric),
        );
        Ok(metadata)
    }
}

#[async_trait]
impl TableDataProvider for RecordingProvider {
    async fn fetch_data(
        &self,
        data_source: &DataSourceInfo,
        _query: &str,
        _params: &[Value],
        _limit: usize,
    ) -> Result<TableData> {
        self.observe(data_source)?;
        let mut row = BTreeMap::new();
        row.insert("provider".to_string(), Value::from(self.name.as_str()));
        Ok(TableData {
            columns: vec![Column {
                name: "provider".to_string(),
                column_type: SemanticType::String,
            }],
            rows: vec![row],
            truncated: false,
        })
    }
}

/// A descriptor that needs a tunnel
pub fn remote_source(tag: &str) -> DataSourceInfo {
    DataSourceInfo::new(7, tag, "warehouse")
        .with_server("db.internal", 5432)
        .with_database("warehouse")
        .with_gateway("bastion.example.com", 2222, "")
}
