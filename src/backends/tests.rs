//! Backend tests

use super::memory::{self, INDEX_PAGE_SIZE};
use super::relational::{self, Engine};
use super::*;
use crate::model::{
    DataSourceInfo, Direction, GraphData, PropertyFilter, SemanticType, Value, EDGE_COUNT_KEY,
    IN_KEY, OUT_KEY,
};
use crate::provider::{GraphDataProvider, IndexProvider, MetadataProvider, TableDataProvider};
use crate::registry::PluginManifest;
use crate::sprite::{CollectingPlayer, SpritePlayer};
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, BTreeSet};
use test_case::test_case;

// ============================================================================
// Fixtures
// ============================================================================

fn social() -> MemoryGraph {
    MemoryGraph::new()
        .with_vertex(MemoryVertex::new("#12:0", "Person").with("name", "Ada").with("age", 36))
        .with_vertex(MemoryVertex::new("#12:1", "Person").with("name", "Bob").with("age", "unknown"))
        .with_vertex(MemoryVertex::new("#13:0", "City").with("name", "London"))
        .with_edge(MemoryEdge::new("#20:0", "Knows", "#12:0", "#12:1").with("since", 2001))
        .with_edge(MemoryEdge::new("#21:0", "LivesIn", "#12:0", "#13:0"))
}

fn memory_provider() -> MemoryGraphProvider {
    MemoryGraphProvider::new().with_dataset("social", social())
}

fn memory_source() -> DataSourceInfo {
    DataSourceInfo::new(1, memory::TAG, "social").with_database("social")
}

fn ids(data: &GraphData) -> (BTreeSet<String>, BTreeSet<String>) {
    (
        data.nodes.iter().map(|n| n.id().to_string()).collect(),
        data.edges.iter().map(|e| e.id().to_string()).collect(),
    )
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(ToString::to_string).collect()
}

fn counts(pairs: &[(&str, i64)]) -> Value {
    Value::Map(
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), Value::Int(*v)))
            .collect(),
    )
}

// ============================================================================
// Memory: graph queries
// ============================================================================

#[tokio::test]
async fn test_memory_fetch_everything() {
    let provider = memory_provider();
    let data = GraphDataProvider::fetch_data(&provider, &memory_source(), "*", 100)
        .await
        .unwrap();

    assert!(data.is_well_formed());
    assert!(!data.truncated);
    assert_eq!(
        ids(&data),
        (set(&["1_12_0", "1_12_1", "1_13_0"]), set(&["1_20_0", "1_21_0"]))
    );

    let ada = &data.nodes.get("1_12_0").unwrap().data.record;
    assert_eq!(ada[OUT_KEY], counts(&[("Knows", 1), ("LivesIn", 1)]));
    assert_eq!(ada[IN_KEY], counts(&[]));
    assert_eq!(ada[EDGE_COUNT_KEY], Value::Int(2));

    let knows = data.edges.get("1_20_0").unwrap();
    assert_eq!(knows.data.source.as_deref(), Some("1_12_0"));
    assert_eq!(knows.data.target.as_deref(), Some("1_12_1"));
}

#[tokio::test]
async fn test_memory_fetch_keeps_first_property_type() {
    let provider = memory_provider();
    let data = GraphDataProvider::fetch_data(&provider, &memory_source(), "Person", 100)
        .await
        .unwrap();

    assert_eq!(data.nodes.len(), 2);
    assert!(data.edges.is_empty());
    assert_eq!(data.nodes_classes["Person"]["age"], SemanticType::Numeric);
}

#[tokio::test]
async fn test_memory_fetch_truncates_at_limit() {
    let provider = memory_provider();
    let data = GraphDataProvider::fetch_data(&provider, &memory_source(), "Person", 1)
        .await
        .unwrap();

    assert_eq!(data.nodes.len(), 1);
    assert!(data.truncated);
}

#[tokio::test]
async fn test_memory_fetch_zero_limit_is_unlimited() {
    let provider = memory_provider();
    let data = GraphDataProvider::fetch_data(&provider, &memory_source(), "*", 0)
        .await
        .unwrap();

    assert_eq!(data.nodes.len(), 3);
    assert_eq!(data.edges.len(), 2);
    assert!(!data.truncated);
}

#[tokio::test]
async fn test_memory_fetch_unknown_class() {
    let provider = memory_provider();
    let err = GraphDataProvider::fetch_data(&provider, &memory_source(), "Planet", 10)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::Error::NotFound { .. }));
}

#[test_case(Direction::Out, None, 1, &["1_12_1", "1_13_0"], &["1_20_0", "1_21_0"] ; "out one hop")]
#[test_case(Direction::Out, Some("Knows"), 1, &["1_12_1"], &["1_20_0"] ; "out by label")]
#[test_case(Direction::In, None, 1, &[], &[] ; "nothing points at ada")]
#[test_case(Direction::Both, None, 0, &["1_12_1", "1_13_0"], &["1_20_0", "1_21_0"] ; "zero hops means one")]
#[tokio::test]
async fn test_memory_expand_from_ada(
    direction: Direction,
    label: Option<&str>,
    hops: usize,
    nodes: &[&str],
    edges: &[&str],
) {
    let provider = memory_provider();
    let data = provider
        .expand(&memory_source(), &["1_12_0".to_string()], direction, label, hops)
        .await
        .unwrap();

    assert_eq!(ids(&data), (set(nodes), set(edges)));
}

#[tokio::test]
async fn test_memory_expand_two_hops() {
    let provider = memory_provider();
    let data = provider
        .expand(&memory_source(), &["1_12_1".to_string()], Direction::Both, None, 2)
        .await
        .unwrap();

    assert_eq!(
        ids(&data),
        (set(&["1_12_0", "1_13_0"]), set(&["1_20_0", "1_21_0"]))
    );
}

#[tokio::test]
async fn test_memory_expand_rejects_foreign_ids() {
    let provider = memory_provider();
    let err = provider
        .expand(&memory_source(), &["2_12_0".to_string()], Direction::Both, None, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::Error::InvalidId { .. }));
}

#[tokio::test]
async fn test_memory_load_vertices_and_edges() {
    let provider = memory_provider();
    let data = provider
        .load(
            &memory_source(),
            &["1_13_0".to_string(), "1_21_0".to_string(), "1_99_9".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(ids(&data), (set(&["1_13_0"]), set(&["1_21_0"])));
    assert!(data.is_well_formed());
}

#[tokio::test]
async fn test_memory_load_from_class_with_filter() {
    let provider = memory_provider();
    let filter = PropertyFilter::new("name", "Bob");
    let data = provider
        .load_from_class(&memory_source(), "Person", Some(&filter), 10)
        .await
        .unwrap();

    assert_eq!(ids(&data).0, set(&["1_12_1"]));

    let all = provider
        .load_from_class(&memory_source(), "Person", None, 10)
        .await
        .unwrap();
    assert_eq!(all.nodes.len(), 2);
}

#[tokio::test]
async fn test_memory_edges_between() {
    let provider = memory_provider();
    let source = memory_source();
    let from = ["1_12_0".to_string()];

    let any = provider.edges(&source, &from, &[], &[]).await.unwrap();
    assert_eq!(ids(&any).1, set(&["1_20_0", "1_21_0"]));

    let labelled = provider
        .edges(&source, &from, &["LivesIn".to_string()], &[])
        .await
        .unwrap();
    assert_eq!(ids(&labelled).1, set(&["1_21_0"]));

    let targeted = provider
        .edges(&source, &from, &[], &["1_12_1".to_string()])
        .await
        .unwrap();
    assert_eq!(ids(&targeted).1, set(&["1_20_0"]));
}

#[tokio::test]
async fn test_memory_test_connection() {
    let provider = memory_provider();
    provider.test_connection(&memory_source()).await.unwrap();

    let missing = memory_source().with_database("nope");
    let err = provider.test_connection(&missing).await.unwrap_err();
    assert!(matches!(err, crate::Error::NotFound { .. }));
}

// ============================================================================
// Memory: indexing and metadata
// ============================================================================

#[tokio::test]
async fn test_memory_index_windows_per_class() {
    let provider = memory_provider();
    let mut player = CollectingPlayer::new();

    provider.provide_to(&memory_source(), &mut player).await.unwrap();

    assert_eq!(player.processed(), 5);
    // City, Person, Knows, LivesIn
    assert_eq!(player.begins(), 4);
    assert_eq!(player.ends(), 4);

    let sprites = player.into_sprites();
    assert_eq!(sprites[0].value_of("@class").unwrap(), "City");
    assert_eq!(sprites[0].value_of("@id").unwrap(), "1_13_0");

    let knows = sprites
        .iter()
        .find(|s| s.has_value("@class", &Value::from("Knows")))
        .unwrap();
    assert_eq!(knows.value_of("@source").unwrap(), "1_12_0");
    assert_eq!(knows.raw_value_of::<i64>("since").unwrap(), 2001);
}

#[tokio::test]
async fn test_memory_index_pages_large_classes() {
    let mut graph = MemoryGraph::new();
    for i in 0..(INDEX_PAGE_SIZE + 1) {
        graph = graph.with_vertex(MemoryVertex::new(format!("#9:{i}"), "Item"));
    }
    let provider = MemoryGraphProvider::new().with_dataset("social", graph);
    let mut player = CollectingPlayer::new();

    provider.provide_to(&memory_source(), &mut player).await.unwrap();

    assert_eq!(player.processed(), (INDEX_PAGE_SIZE + 1) as u64);
    assert_eq!(player.ends(), 2);
}

#[tokio::test]
async fn test_memory_metadata() {
    let provider = memory_provider();
    let metadata = provider.fetch_metadata(&memory_source()).await.unwrap();

    let person = &metadata.nodes_classes["Person"];
    assert_eq!(person.cardinality, 2);
    assert_eq!(person.properties["age"].property_type, SemanticType::Numeric);
    assert_eq!(person.properties["name"].property_type, SemanticType::String);

    assert_eq!(metadata.nodes_classes["City"].cardinality, 1);
    assert_eq!(metadata.edges_classes["Knows"].cardinality, 1);
    assert!(metadata.edges_classes["LivesIn"].properties.is_empty());
}

#[tokio::test]
async fn test_memory_factory_loads_datasets() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("social.json"),
        serde_json::to_string(&social()).unwrap(),
    )
    .unwrap();

    let mut manifest: PluginManifest = serde_yaml::from_str(
        "name: graphs\nfactory: memory\nsettings:\n  datasets:\n    social: social.json\n",
    )
    .unwrap();
    manifest.base_dir = dir.path().to_path_buf();

    let unit = memory::factory(&manifest).unwrap();
    assert_eq!(unit.graph_providers().len(), 1);
    assert!(unit.table_providers().is_empty());

    let graph = unit.graph_providers()[0].clone();
    let data = graph.fetch_data(&memory_source(), "*", 10).await.unwrap();
    assert_eq!(data.nodes.len(), 3);
}

#[test]
fn test_memory_factory_missing_file() {
    let mut manifest = PluginManifest::named("memory");
    manifest.settings.insert(
        "datasets".to_string(),
        serde_yaml::from_str("{social: /does/not/exist.json}").unwrap(),
    );

    assert!(memory::factory(&manifest).unwrap_err().is_configuration());
}

#[test]
fn test_memory_graph_from_json() {
    let graph = MemoryGraph::from_json(
        r##"{"vertices": [{"id": "#1:0", "class": "V", "properties": {"n": 1.5}}]}"##,
    )
    .unwrap();

    assert_eq!(graph.vertices[0].properties["n"], Value::Float(1.5));
    assert!(graph.edges.is_empty());
}

// ============================================================================
// Relational
// ============================================================================

fn people_db() -> (tempfile::TempDir, DataSourceInfo) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.duckdb");
    {
        let conn = duckdb::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE people (id INTEGER, name VARCHAR, born DATE, active BOOLEAN);
             INSERT INTO people VALUES
               (1, 'Ada', '1815-12-10', true),
               (2, 'Grace', '1906-12-09', false),
               (3, 'Edsger', NULL, true);
             CREATE TABLE teams (name VARCHAR);",
        )
        .unwrap();
    }
    let ds = DataSourceInfo::new(3, "duckdb", "people").with_database(path.to_string_lossy());
    (dir, ds)
}

#[tokio::test]
async fn test_relational_query_with_params_and_truncation() {
    let (_dir, ds) = people_db();
    let provider = RelationalProvider::new();

    let table = TableDataProvider::fetch_data(
        &provider,
        &ds,
        "SELECT id, name FROM people WHERE id >= ?",
        &[Value::Int(1)],
        2,
    )
    .await
    .unwrap();

    assert_eq!(table.rows.len(), 2);
    assert!(table.truncated);
    let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name"]);
    assert_eq!(table.columns[0].column_type, SemanticType::Numeric);
    assert_eq!(table.columns[1].column_type, SemanticType::String);
}

#[tokio::test]
async fn test_relational_query_exact_fit_is_not_truncated() {
    let (_dir, ds) = people_db();
    let provider = RelationalProvider::new();

    let table = TableDataProvider::fetch_data(&provider, &ds, "SELECT * FROM people;", &[], 3)
        .await
        .unwrap();

    assert_eq!(table.rows.len(), 3);
    assert!(!table.truncated);
}

#[test]
fn test_relational_query_without_headroom_for_extra_row() {
    let (_dir, ds) = people_db();
    let conn = relational::connect(&ds).unwrap();

    let table = relational::query_table(&conn, "SELECT * FROM people", &[], usize::MAX).unwrap();

    assert_eq!(table.rows.len(), 3);
    assert!(!table.truncated);
}

#[tokio::test]
async fn test_relational_metadata() {
    let (_dir, ds) = people_db();
    let metadata = RelationalProvider::new().fetch_metadata(&ds).await.unwrap();

    let people = &metadata.nodes_classes["people"];
    assert_eq!(people.cardinality, 3);
    assert_eq!(people.properties["id"].property_type, SemanticType::Numeric);
    assert_eq!(people.properties["name"].property_type, SemanticType::String);
    assert_eq!(people.properties["born"].property_type, SemanticType::Date);
    assert_eq!(people.properties["active"].property_type, SemanticType::Boolean);
    assert_eq!(metadata.nodes_classes["teams"].cardinality, 0);
}

#[tokio::test]
async fn test_relational_index() {
    let (_dir, ds) = people_db();
    let mut player = CollectingPlayer::new();

    RelationalProvider::new().provide_to(&ds, &mut player).await.unwrap();

    assert_eq!(player.processed(), 3);
    assert_eq!(player.begins(), 1);
    let sprites = player.into_sprites();
    assert!(sprites
        .iter()
        .all(|s| s.value_of(relational::TABLE_FIELD).unwrap() == "people"));
    let edsger = sprites
        .iter()
        .find(|s| s.has_value("name", &Value::from("Edsger")))
        .unwrap();
    assert!(!edsger.has_field("born"));
}

#[tokio::test]
async fn test_relational_index_pages_cover_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("numbers.duckdb");
    {
        let conn = duckdb::Connection::open(&path).unwrap();
        // 2503 is prime, so this is a shuffled permutation of 0..2503
        conn.execute_batch(
            "CREATE TABLE numbers AS SELECT (i * 7919) % 2503 AS n FROM range(2503) t(i);",
        )
        .unwrap();
    }
    let ds = DataSourceInfo::new(4, "duckdb", "numbers").with_database(path.to_string_lossy());
    let mut player = CollectingPlayer::new();

    RelationalProvider::new().provide_to(&ds, &mut player).await.unwrap();

    assert_eq!(player.processed(), 2503);
    assert_eq!(player.begins(), 3);
    let seen: BTreeSet<String> = player
        .sprites()
        .iter()
        .map(|s| s.value_of("n").unwrap())
        .collect();
    assert_eq!(seen.len(), 2503);
}

#[test]
fn test_relational_page_query_is_ordered() {
    let table = relational::TableInfo {
        schema: "main".to_string(),
        name: "people".to_string(),
        columns: vec![
            ("id".to_string(), "INTEGER".to_string()),
            ("full \"name\"".to_string(), "VARCHAR".to_string()),
        ],
    };

    assert_eq!(
        table.page_query(2000),
        r#"SELECT * FROM source_db."main"."people" ORDER BY "id", "full ""name""" LIMIT 1000 OFFSET 2000"#
    );
}

#[test]
fn test_relational_check() {
    let (_dir, ds) = people_db();
    RelationalProvider::new().check(&ds).unwrap();

    let missing = DataSourceInfo::new(3, "duckdb", "none");
    assert!(RelationalProvider::new().check(&missing).unwrap_err().is_configuration());
}

#[test]
fn test_relational_connection_strings() {
    let pg = DataSourceInfo::new(1, "postgresql", "pg")
        .with_server("db.internal", 0)
        .with_database("app")
        .with_credentials("reader", "secret");
    assert_eq!(
        relational::connection_string(Engine::Postgres, &pg).unwrap(),
        "host='db.internal' port=5432 dbname='app' user='reader' password='secret'"
    );

    let mut ssl = pg.clone();
    ssl.enable_ssl = true;
    assert!(relational::connection_string(Engine::Postgres, &ssl)
        .unwrap()
        .ends_with(" sslmode=verify-full"));
    ssl.skip_cert_validation = true;
    assert!(relational::connection_string(Engine::Postgres, &ssl)
        .unwrap()
        .ends_with(" sslmode=require"));

    let tunneled = pg.to_local(40123);
    assert_eq!(
        relational::connection_string(Engine::Postgres, &tunneled).unwrap(),
        "host='localhost' port=40123 dbname='app' user='reader' password='secret'"
    );

    let my = DataSourceInfo::new(1, "mysql", "my").with_database("shop");
    assert_eq!(
        relational::connection_string(Engine::Mysql, &my).unwrap(),
        "host='localhost' port=3306 database='shop'"
    );
}

#[test]
fn test_relational_connection_string_quotes_credentials() {
    let pg = DataSourceInfo::new(1, "postgresql", "pg")
        .with_server("db.internal", 5432)
        .with_database("app")
        .with_credentials("bob", r"p@ss/w:rd'x\y");
    assert_eq!(
        relational::connection_string(Engine::Postgres, &pg).unwrap(),
        r"host='db.internal' port=5432 dbname='app' user='bob' password='p@ss/w:rd\'x\\y'"
    );

    let my = DataSourceInfo::new(1, "mysql", "my")
        .with_database("shop")
        .with_credentials("bob", "p@ss word");
    assert_eq!(
        relational::connection_string(Engine::Mysql, &my).unwrap(),
        "host='localhost' port=3306 database='shop' user='bob' passwd='p@ss word'"
    );
}

#[test_case("duckdb", Engine::Duckdb)]
#[test_case("sqlite", Engine::Sqlite)]
#[test_case("postgresql", Engine::Postgres)]
#[test_case("mysql", Engine::Mysql)]
fn test_engine_from_tag(tag: &str, engine: Engine) {
    assert_eq!(Engine::from_tag(tag).unwrap(), engine);
}

#[test]
fn test_engine_unknown_tag() {
    assert!(Engine::from_tag("oracle").unwrap_err().is_configuration());
}

#[test]
fn test_value_conversion() {
    use duckdb::types::Value as Duck;

    assert_eq!(relational::from_duckdb(Duck::Null), Value::Null);
    assert_eq!(relational::from_duckdb(Duck::Int(42)), Value::Int(42));
    assert_eq!(relational::from_duckdb(Duck::UBigInt(u64::MAX)), Value::String(u64::MAX.to_string()));
    assert_eq!(relational::from_duckdb(Duck::Text("x".into())), Value::from("x"));
    assert_eq!(relational::from_duckdb(Duck::Double(0.5)), Value::Float(0.5));
    assert!(matches!(relational::from_duckdb(Duck::Date32(0)), Value::Date(_)));

    assert_eq!(relational::to_duckdb(&Value::Int(7)), Duck::BigInt(7));
    assert_eq!(relational::to_duckdb(&Value::from("s")), Duck::Text("s".into()));

    let mut map = BTreeMap::new();
    map.insert("k".to_string(), Value::Int(1));
    assert_eq!(relational::to_duckdb(&Value::Map(map)), Duck::Text(r#"{"k":1}"#.into()));
}
