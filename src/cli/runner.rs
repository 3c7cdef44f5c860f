//! CLI runner - executes commands

use crate::backends::relational::PROBE_QUERY;
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::load_data_source;
use crate::error::Result;
use crate::model::{DataSourceInfo, Direction, Value};
use crate::registry::{PluginCatalog, PluginLinker, Providers};
use crate::sprite::{JsonLinesPlayer, SpritePlayer};
use crate::tunnel::{SshConfig, Tunnel};
use serde_json::json;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Providers => self.providers(),
            Commands::Check { datasource } => self.check(datasource).await,
            Commands::Metadata { datasource } => self.metadata(datasource).await,
            Commands::Query {
                datasource,
                query,
                params,
                limit,
            } => self.query(datasource, query, params, *limit).await,
            Commands::Graph {
                datasource,
                query,
                limit,
            } => self.graph(datasource, query, *limit).await,
            Commands::Expand {
                datasource,
                ids,
                direction,
                label,
                hops,
            } => {
                self.expand(datasource, ids, direction, label.as_deref(), *hops)
                    .await
            }
            Commands::Load { datasource, ids } => self.load_elements(datasource, ids).await,
            Commands::Index { datasource } => self.index(datasource).await,
        }
    }

    /// Build the registries, from the plugin directory when one is given
    fn load_providers(&self) -> Result<Providers> {
        let span = info_span!("graphgate");
        let tunnel = Arc::new(Tunnel::openssh(SshConfig::from_env()?).with_span(span.clone()));

        let providers = match &self.cli.plugins_dir {
            Some(dir) => Providers::discover(dir, &PluginLinker::builtin(), tunnel)?,
            None => Providers::new(&PluginCatalog::builtin()?, tunnel),
        };
        Ok(providers.with_span(span))
    }

    fn open(&self, path: &Path) -> Result<(Providers, DataSourceInfo)> {
        let data_source = load_data_source(path)?;
        let providers = self.load_providers()?;
        Ok((providers, data_source))
    }

    /// List registered tags per capability
    fn providers(&self) -> Result<()> {
        let providers = self.load_providers()?;
        self.output_message(&json!({
            "type": "PROVIDERS",
            "providers": providers.describe()
        }));
        Ok(())
    }

    /// Check connection
    async fn check(&self, path: &Path) -> Result<()> {
        let (providers, data_source) = self.open(path)?;
        let tag = &data_source.data_source_type;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!("Checking connection to {}", data_source.name)
            }
        }));

        // graph backends know how to test themselves; others get a probe call
        let result = if providers.graph.provides().contains(tag) {
            let provider = providers.graph(&data_source)?;
            provider.test_connection(&data_source).await
        } else if providers.table.provides().contains(tag) {
            let provider = providers.table(&data_source)?;
            provider
                .fetch_data(&data_source, PROBE_QUERY, &[], 1)
                .await
                .map(|_| ())
        } else {
            let provider = providers.metadata(&data_source)?;
            provider.fetch_metadata(&data_source).await.map(|_| ())
        };

        let status = match result {
            Ok(()) => json!({ "status": "SUCCEEDED", "message": "Connection successful" }),
            Err(e) => json!({ "status": "FAILED", "message": format!("Connection failed: {e}") }),
        };
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": status
        }));
        Ok(())
    }

    async fn metadata(&self, path: &Path) -> Result<()> {
        let (providers, data_source) = self.open(path)?;
        let metadata = providers
            .metadata(&data_source)?
            .fetch_metadata(&data_source)
            .await?;

        self.output_message(&json!({
            "type": "METADATA",
            "metadata": metadata
        }));
        Ok(())
    }

    async fn query(&self, path: &Path, query: &str, params: &[String], limit: usize) -> Result<()> {
        let (providers, data_source) = self.open(path)?;
        let params: Vec<Value> = params.iter().map(|p| parse_param(p)).collect();

        let started = Instant::now();
        let table = providers
            .table(&data_source)?
            .fetch_data(&data_source, query, &params, limit)
            .await?;
        info!(
            data_source = %data_source.name,
            rows = table.rows.len(),
            truncated = table.truncated,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query finished"
        );

        self.output_message(&json!({
            "type": "TABLE",
            "table": table
        }));
        Ok(())
    }

    async fn graph(&self, path: &Path, query: &str, limit: usize) -> Result<()> {
        let (providers, data_source) = self.open(path)?;
        let data = providers
            .graph(&data_source)?
            .fetch_data(&data_source, query, limit)
            .await?;

        self.output_message(&json!({
            "type": "GRAPH",
            "graph": data
        }));
        Ok(())
    }

    async fn expand(
        &self,
        path: &Path,
        ids: &[String],
        direction: &str,
        label: Option<&str>,
        hops: usize,
    ) -> Result<()> {
        let direction: Direction = direction.parse()?;
        let (providers, data_source) = self.open(path)?;
        let data = providers
            .graph(&data_source)?
            .expand(&data_source, ids, direction, label, hops)
            .await?;

        self.output_message(&json!({
            "type": "GRAPH",
            "graph": data
        }));
        Ok(())
    }

    async fn load_elements(&self, path: &Path, ids: &[String]) -> Result<()> {
        let (providers, data_source) = self.open(path)?;
        let data = providers.graph(&data_source)?.load(&data_source, ids).await?;

        self.output_message(&json!({
            "type": "GRAPH",
            "graph": data
        }));
        Ok(())
    }

    /// Stream every sprite to stdout, one JSON object per line
    async fn index(&self, path: &Path) -> Result<()> {
        let (providers, data_source) = self.open(path)?;
        let provider = providers.index(&data_source)?;

        let started = Instant::now();
        let mut player = JsonLinesPlayer::new(BufWriter::new(std::io::stdout()));
        provider.provide_to(&data_source, &mut player).await?;
        let processed = player.processed();
        player.into_inner().flush()?;

        info!(
            data_source = %data_source.name,
            processed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Index finished"
        );
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &serde_json::Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Read a `--param` value: JSON scalars keep their type, anything else is text
pub fn parse_param(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json @ (serde_json::Value::Null
        | serde_json::Value::Bool(_)
        | serde_json::Value::Number(_)
        | serde_json::Value::String(_))) => Value::from(json),
        _ => Value::String(raw.to_string()),
    }
}
