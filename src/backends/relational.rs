//! Relational backend over DuckDB
//!
//! Every call opens an in-memory DuckDB connection and attaches the target
//! database as `source_db` (read only): DuckDB and SQLite files directly,
//! PostgreSQL and MySQL through DuckDB's scanner extensions. Unqualified
//! table names in queries resolve against `source_db`.

use crate::error::{Error, Result};
use crate::model::{
    map_type, Column, DataSourceInfo, DataSourceMetadata, SemanticType, TableData, TypeClass,
    Value,
};
use crate::provider::{tags, DataSourceTypes, IndexProvider, MetadataProvider, TableDataProvider};
use crate::registry::{PluginManifest, PluginUnit};
use crate::sprite::{offer, Sprite, SpritePlayer};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::types::{TimeUnit, Value as DuckValue};
use duckdb::Connection;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

pub const FACTORY_NAME: &str = "relational";

/// Field carrying the source table on indexed sprites
pub const TABLE_FIELD: &str = "@table";

/// Rows per `begin`/`end` window during indexing
pub const INDEX_PAGE_SIZE: usize = 1000;

/// Query used to check a connection
pub const PROBE_QUERY: &str = "SELECT 1";

/// Engine behind a data source type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Duckdb,
    Sqlite,
    Postgres,
    Mysql,
}

impl Engine {
    pub const TAGS: [&'static str; 4] = ["duckdb", "sqlite", "postgresql", "mysql"];

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "duckdb" => Ok(Engine::Duckdb),
            "sqlite" => Ok(Engine::Sqlite),
            "postgresql" => Ok(Engine::Postgres),
            "mysql" => Ok(Engine::Mysql),
            other => Err(Error::unsupported(other)),
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Engine::Postgres => 5432,
            Engine::Mysql => 3306,
            Engine::Duckdb | Engine::Sqlite => 0,
        }
    }

    /// Scanner extension and ATTACH type, for engines that need one
    fn scanner(self) -> Option<(&'static str, &'static str)> {
        match self {
            Engine::Duckdb => None,
            Engine::Sqlite => Some(("sqlite", "SQLITE")),
            Engine::Postgres => Some(("postgres", "POSTGRES")),
            Engine::Mysql => Some(("mysql", "MYSQL")),
        }
    }

    /// Schemas that are implied when naming a table
    fn default_schema(self, schema: &str) -> bool {
        matches!(schema, "main" | "public") || (self == Engine::Mysql && schema.is_empty())
    }
}

// ============================================================================
// Connection
// ============================================================================

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Value in a libpq-style `key=value` connection string
fn dsn_value(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Connection string DuckDB understands for the data source
///
/// Server engines get a `key=value` string with every text value quoted, so
/// credentials may contain any character. Empty user and password are left
/// out for the driver to default.
pub fn connection_string(engine: Engine, data_source: &DataSourceInfo) -> Result<String> {
    let host = if data_source.server.is_empty() {
        "localhost"
    } else {
        data_source.server.as_str()
    };
    let port = if data_source.port == 0 {
        engine.default_port()
    } else {
        data_source.port
    };

    let (database_key, password_key) = match engine {
        Engine::Duckdb | Engine::Sqlite => {
            if data_source.database.trim().is_empty() {
                return Err(Error::config(format!(
                    "Data source '{}' needs a database file",
                    data_source.name
                )));
            }
            return Ok(data_source.database.clone());
        }
        Engine::Postgres => ("dbname", "password"),
        Engine::Mysql => ("database", "passwd"),
    };

    let mut parts = vec![
        format!("host={}", dsn_value(host)),
        format!("port={port}"),
        format!("{database_key}={}", dsn_value(&data_source.database)),
    ];
    if !data_source.username.is_empty() {
        parts.push(format!("user={}", dsn_value(&data_source.username)));
    }
    if !data_source.password.is_empty() {
        parts.push(format!("{password_key}={}", dsn_value(&data_source.password)));
    }
    if engine == Engine::Postgres && data_source.enable_ssl {
        let mode = if data_source.skip_cert_validation {
            "require"
        } else {
            "verify-full"
        };
        parts.push(format!("sslmode={mode}"));
    }
    Ok(parts.join(" "))
}

/// Open a DuckDB connection with the data source attached as `source_db`
pub fn connect(data_source: &DataSourceInfo) -> Result<Connection> {
    let engine = Engine::from_tag(&data_source.data_source_type)?;
    let target = connection_string(engine, data_source)?;
    let conn = Connection::open_in_memory()
        .map_err(|e| Error::backend_with("Failed to create DuckDB connection", e))?;

    let attach = match engine.scanner() {
        Some((extension, attach_type)) => {
            conn.execute_batch(&format!("INSTALL {extension}; LOAD {extension};"))
                .map_err(|e| Error::backend_with(format!("Failed to load {extension} extension"), e))?;
            format!(
                "ATTACH {} AS source_db (TYPE {attach_type}, READ_ONLY);",
                quote_literal(&target)
            )
        }
        None => format!("ATTACH {} AS source_db (READ_ONLY);", quote_literal(&target)),
    };

    conn.execute_batch(&attach)
        .map_err(|e| Error::backend_with(format!("Failed to attach {}", data_source.name), e))?;
    conn.execute_batch("USE source_db;")?;

    debug!(data_source = %data_source.name, engine = ?engine, "Attached source_db");
    Ok(conn)
}

// ============================================================================
// Values
// ============================================================================

/// Bind parameter for a query
pub fn to_duckdb(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Int(i) => DuckValue::BigInt(*i),
        Value::Float(f) => DuckValue::Double(*f),
        Value::String(s) => DuckValue::Text(s.clone()),
        Value::Date(d) => DuckValue::Timestamp(TimeUnit::Microsecond, d.timestamp_micros()),
        Value::List(_) | Value::Map(_) | Value::Raw(_) => DuckValue::Text(value.to_json().to_string()),
    }
}

fn timestamp(unit: TimeUnit, raw: i64) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Second => DateTime::from_timestamp(raw, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(raw),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(raw),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(raw)),
    }
}

/// Column value as a model value
pub fn from_duckdb(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::Int(i.into()),
        DuckValue::SmallInt(i) => Value::Int(i.into()),
        DuckValue::Int(i) => Value::Int(i.into()),
        DuckValue::BigInt(i) => Value::Int(i),
        DuckValue::UTinyInt(i) => Value::Int(i.into()),
        DuckValue::USmallInt(i) => Value::Int(i.into()),
        DuckValue::UInt(i) => Value::Int(i.into()),
        DuckValue::UBigInt(i) => i64::try_from(i).map_or_else(|_| Value::String(i.to_string()), Value::Int),
        DuckValue::HugeInt(i) => i64::try_from(i).map_or_else(|_| Value::String(i.to_string()), Value::Int),
        DuckValue::Float(f) => Value::Float(f.into()),
        DuckValue::Double(f) => Value::Float(f),
        DuckValue::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map_or_else(|_| Value::String(d.to_string()), Value::Float),
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Blob(bytes) => Value::Raw(serde_json::Value::from(bytes)),
        DuckValue::Timestamp(unit, raw) => timestamp(unit, raw).map_or(Value::Int(raw), Value::Date),
        DuckValue::Date32(days) => NaiveDate::from_num_days_from_ce_opt(days + 719_163)
            .map_or(Value::Int(days.into()), Value::from),
        other => Value::Raw(serde_json::Value::String(format!("{other:?}"))),
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Run a query, keeping at most `limit` rows (0 keeps all)
pub fn query_table(conn: &Connection, query: &str, params: &[Value], limit: usize) -> Result<TableData> {
    let query = query.trim().trim_end_matches(';');
    // one extra row tells a full page from a truncated one
    let sql = match limit.checked_add(1) {
        Some(fetch) if limit > 0 => format!("SELECT * FROM ({query}) AS q LIMIT {fetch}"),
        _ => query.to_string(),
    };

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(duckdb::params_from_iter(params.iter().map(to_duckdb)))?;
    let names: Vec<String> = rows.as_ref().map(|s| s.column_names()).unwrap_or_default();

    let mut table = TableData::default();
    while let Some(row) = rows.next()? {
        if limit > 0 && table.rows.len() == limit {
            table.truncated = true;
            break;
        }
        let mut record = BTreeMap::new();
        for (i, name) in names.iter().enumerate() {
            let value: DuckValue = row.get(i)?;
            record.insert(name.clone(), from_duckdb(value));
        }
        table.rows.push(record);
    }

    table.columns = names
        .into_iter()
        .map(|name| {
            let column_type = table
                .rows
                .iter()
                .filter_map(|row| row.get(&name))
                .find(|v| !v.is_null())
                .map_or(SemanticType::String, SemanticType::of);
            Column { name, column_type }
        })
        .collect();

    Ok(table)
}

/// A table of `source_db` and its columns
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub columns: Vec<(String, String)>,
}

impl TableInfo {
    /// Name the table is known by in metadata and sprites
    pub fn class_name(&self, engine: Engine) -> String {
        if engine.default_schema(&self.schema) {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }

    fn qualified(&self) -> String {
        format!(
            "source_db.{}.{}",
            quote_ident(&self.schema),
            quote_ident(&self.name)
        )
    }

    /// One indexing page, ordered on every column so pages never overlap
    pub fn page_query(&self, offset: usize) -> String {
        let order: Vec<String> = self.columns.iter().map(|(c, _)| quote_ident(c)).collect();
        format!(
            "SELECT * FROM {} ORDER BY {} LIMIT {INDEX_PAGE_SIZE} OFFSET {offset}",
            self.qualified(),
            order.join(", ")
        )
    }
}

/// Tables and columns of `source_db`, in name order
pub fn list_tables(conn: &Connection) -> Result<Vec<TableInfo>> {
    let mut stmt = conn.prepare(
        "SELECT table_schema, table_name, column_name, data_type
         FROM information_schema.columns
         WHERE table_catalog = 'source_db'
           AND table_schema NOT IN ('information_schema', 'pg_catalog')
         ORDER BY table_schema, table_name, ordinal_position",
    )?;
    let columns = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut tables: Vec<TableInfo> = Vec::new();
    for (schema, table, column, data_type) in columns {
        match tables.last_mut() {
            Some(last) if last.schema == schema && last.name == table => {
                last.columns.push((column, data_type));
            }
            _ => tables.push(TableInfo {
                schema,
                name: table,
                columns: vec![(column, data_type)],
            }),
        }
    }
    Ok(tables)
}

fn row_count(conn: &Connection, table: &TableInfo) -> Result<u64> {
    let count: i64 = conn.query_row(&format!("SELECT count(*) FROM {}", table.qualified()), [], |row| {
        row.get(0)
    })?;
    Ok(u64::try_from(count).unwrap_or_default())
}

// ============================================================================
// Provider
// ============================================================================

/// Tabular, metadata and indexing provider for relational databases
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationalProvider;

impl RelationalProvider {
    pub fn new() -> Self {
        Self
    }

    /// Attach the data source and run [`PROBE_QUERY`]
    pub fn check(&self, data_source: &DataSourceInfo) -> Result<()> {
        let conn = connect(data_source)?;
        conn.execute_batch(PROBE_QUERY)?;
        Ok(())
    }

    fn metadata(data_source: &DataSourceInfo) -> Result<DataSourceMetadata> {
        let engine = Engine::from_tag(&data_source.data_source_type)?;
        let conn = connect(data_source)?;
        let mut metadata = DataSourceMetadata::default();

        for table in list_tables(&conn)? {
            let mut class = TypeClass::new(table.class_name(engine), row_count(&conn, &table)?);
            for (column, data_type) in &table.columns {
                class = class.with_property(column, map_type(data_type));
            }
            metadata.nodes_classes.insert(class.name.clone(), class);
        }

        debug!(data_source = %data_source.name, tables = metadata.nodes_classes.len(), "Fetched metadata");
        Ok(metadata)
    }

    fn index(data_source: &DataSourceInfo, player: &mut dyn SpritePlayer) -> Result<()> {
        let engine = Engine::from_tag(&data_source.data_source_type)?;
        let conn = connect(data_source)?;

        for table in list_tables(&conn)? {
            let class = table.class_name(engine);
            let mut offset = 0usize;
            loop {
                let page = query_table(&conn, &table.page_query(offset), &[], 0)?;
                if page.rows.is_empty() {
                    break;
                }

                player.begin()?;
                let fetched = page.rows.len();
                for row in page.rows {
                    let mut sprite = Sprite::new();
                    sprite.add(TABLE_FIELD, class.as_str()).load(row);
                    offer(player, sprite)?;
                }
                player.end()?;

                if fetched < INDEX_PAGE_SIZE {
                    break;
                }
                offset += fetched;
            }
        }

        info!(data_source = %data_source.name, processed = player.processed(), "Indexing complete");
        Ok(())
    }
}

impl DataSourceTypes for RelationalProvider {
    fn supported_data_source_types(&self) -> BTreeSet<String> {
        tags(Engine::TAGS)
    }
}

#[async_trait]
impl TableDataProvider for RelationalProvider {
    async fn fetch_data(
        &self,
        data_source: &DataSourceInfo,
        query: &str,
        params: &[Value],
        limit: usize,
    ) -> Result<TableData> {
        let conn = connect(data_source)?;
        let table = query_table(&conn, query, params, limit)?;
        debug!(
            data_source = %data_source.name,
            rows = table.rows.len(),
            truncated = table.truncated,
            "Query complete"
        );
        Ok(table)
    }
}

#[async_trait]
impl MetadataProvider for RelationalProvider {
    async fn fetch_metadata(&self, data_source: &DataSourceInfo) -> Result<DataSourceMetadata> {
        Self::metadata(data_source)
    }
}

#[async_trait]
impl IndexProvider for RelationalProvider {
    async fn provide_to(
        &self,
        data_source: &DataSourceInfo,
        player: &mut dyn SpritePlayer,
    ) -> Result<()> {
        Self::index(data_source, player)
    }
}

// ============================================================================
// Plugin
// ============================================================================

/// Links a `relational` manifest; takes no settings
pub fn factory(_manifest: &PluginManifest) -> Result<PluginUnit> {
    let provider = Arc::new(RelationalProvider::new());
    Ok(PluginUnit::new(FACTORY_NAME)
        .with_table(provider.clone())
        .with_metadata(provider.clone())
        .with_index(provider))
}
