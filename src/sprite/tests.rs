//! Sprite and player tests

use super::*;
use crate::model::Value;
use pretty_assertions::assert_eq;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(ToString::to_string).collect()
}

// ============================================================================
// Adding
// ============================================================================

#[test]
fn test_add_skips_null_and_blank() {
    let mut sprite = Sprite::new();
    sprite
        .add("a", Value::Null)
        .add("a", "   ")
        .add("a", "")
        .add("b", Option::<String>::None);

    assert!(sprite.is_empty());
}

#[test]
fn test_add_flattens_one_level() {
    let mut sprite = Sprite::new();
    sprite.add(
        "tags",
        Value::List(vec![
            Value::from("a"),
            Value::Null,
            Value::List(vec![Value::from("x"), Value::from("y")]),
        ]),
    );

    assert_eq!(sprite.size_of("tags"), 2);
    assert_eq!(sprite.values_of("tags")[0], "a");
    assert!(sprite.has_value(
        "tags",
        &Value::List(vec![Value::from("x"), Value::from("y")])
    ));
}

#[test]
fn test_add_all_and_if_not_exists() {
    let mut sprite = Sprite::new();
    sprite
        .add_all("n", vec![1, 2, 3])
        .add_if_not_exists("n", 2)
        .add_if_not_exists("n", 4)
        .add_all_if_not_exists("n", vec![1, 5]);

    assert_eq!(sprite.values_of("n"), vec!["1", "2", "3", "4", "5"]);
}

#[test]
fn test_load_from_map() {
    let mut source = BTreeMap::new();
    source.insert("name".to_string(), Value::from("Ada"));
    source.insert("age".to_string(), Value::from(36));
    source.insert("empty".to_string(), Value::Null);

    let mut sprite = Sprite::new();
    sprite.load(source);

    assert_eq!(sprite.fields(), set(&["age", "name"]));
    assert_eq!(sprite.raw_value_of::<i64>("age").unwrap(), 36);
}

// ============================================================================
// Rename / copy
// ============================================================================

#[test]
fn test_rename_moves_values() {
    let mut sprite = Sprite::new();
    sprite.add("f", "v1").add("f", "v2").rename("f", "g");

    assert_eq!(sprite.fields(), set(&["g"]));
    assert_eq!(sprite.values_of("g"), vec!["v1", "v2"]);
}

#[test]
fn test_rename_then_apply() {
    let mut sprite = Sprite::new();
    sprite
        .add("age", 90)
        .rename("age", "weight")
        .apply("weight", |v| Value::from(v.as_f64().unwrap_or_default() * 2.2));

    let weight: f64 = sprite.raw_value_of("weight").unwrap();
    assert!((weight - 198.0).abs() < 1e-9);
    assert_eq!(sprite.raw_value_of::<f32>("weight").unwrap(), 198.0);
}

#[test]
fn test_rename_missing_is_noop() {
    let mut sprite = Sprite::new();
    sprite.rename("missing", "x");
    assert!(sprite.is_empty());
}

#[test]
fn test_rename_appends_to_existing_target() {
    let mut sprite = Sprite::new();
    sprite.add("to", "old").add("from", "new").rename("from", "to");

    assert_eq!(sprite.values_of("to"), vec!["old", "new"]);
    assert!(!sprite.has_field("from"));
}

#[test]
fn test_rename_matching() {
    let mut sprite = Sprite::new();
    sprite.add("attr_a", 1).add("attr_b", 2).add("other", 3);

    let pattern = Regex::new("^attr_").unwrap();
    sprite.rename_matching(&pattern, |f| f.trim_start_matches("attr_").to_string());

    assert_eq!(sprite.fields(), set(&["a", "b", "other"]));
}

#[test]
fn test_copy_keeps_source() {
    let mut sprite = Sprite::new();
    sprite.add("from", "a").add("from", "b").add("to", "z").copy("from", "to");

    assert_eq!(sprite.values_of("from"), vec!["a", "b"]);
    assert_eq!(sprite.values_of("to"), vec!["z", "a", "b"]);
}

// ============================================================================
// Remove
// ============================================================================

#[test]
fn test_remove_variants() {
    let mut sprite = Sprite::new();
    sprite
        .add("keep", "k")
        .add("drop", "d")
        .add("multi", "x")
        .add("multi", "y")
        .add("tmp_1", 1)
        .add("tmp_2", 2);

    sprite
        .remove("drop")
        .remove_value("multi", &Value::from("x"))
        .remove_matching(&Regex::new("^tmp_").unwrap());

    assert_eq!(sprite.fields(), set(&["keep", "multi"]));
    assert_eq!(sprite.values_of("multi"), vec!["y"]);

    sprite.remove_value("multi", &Value::from("y"));
    assert!(!sprite.has_field("multi"));
}

// ============================================================================
// Apply
// ============================================================================

#[test]
fn test_apply_preserves_order() {
    let mut sprite = Sprite::new();
    sprite.add_all("s", vec!["b", "a", "c"]);
    sprite.apply("s", |v| Value::from(v.to_string().to_uppercase()));

    assert_eq!(sprite.values_of("s"), vec!["B", "A", "C"]);
}

#[test]
fn test_apply_matching_and_apply_to() {
    let mut sprite = Sprite::new();
    sprite.add("x_1", 1).add("x_2", 2).add("y", 3);

    sprite.apply_matching(&Regex::new("^x_").unwrap(), |v| {
        Value::from(v.as_i64().unwrap_or_default() * 10)
    });
    sprite.apply_to("y", |v| Value::from(v.as_i64().unwrap_or_default() + 1), "z");

    assert_eq!(sprite.values_of("x_1"), vec!["10"]);
    assert_eq!(sprite.values_of("x_2"), vec!["20"]);
    assert_eq!(sprite.values_of("y"), vec!["3"]);
    assert_eq!(sprite.values_of("z"), vec!["4"]);
}

// ============================================================================
// Split / join
// ============================================================================

#[test]
fn test_split_values_trims_and_drops_empties() {
    let mut sprite = Sprite::new();
    sprite.add("f", "a b  c").split_values("f", " ");

    assert_eq!(sprite.values_of("f"), vec!["a", "b", "c"]);
}

#[test]
fn test_split_values_replaces_all_sources() {
    let mut sprite = Sprite::new();
    sprite.add("f", "a, b").add("f", "c ,d").split_values("f", ",");

    assert_eq!(sprite.values_of("f"), vec!["a", "b", "c", "d"]);
}

#[test]
fn test_join_values() {
    let mut sprite = Sprite::new();
    sprite.add_all("f", vec!["a", "b", "c"]).join_values("f", "|");

    assert!(sprite.is_single_value("f"));
    assert_eq!(sprite.value_of("f").unwrap(), "a|b|c");
}

#[test]
fn test_join_values_with_limit() {
    let mut sprite = Sprite::new();
    sprite.add_all("f", vec!["a", "b", "c", "d"]).join_values_of(
        "f",
        &JoinOptions::separator(",")
            .with_affixes("[", "]")
            .with_limit(2, "..."),
    );

    assert_eq!(sprite.value_of("f").unwrap(), "[a,b,...]");
}

// ============================================================================
// Reading
// ============================================================================

#[test]
fn test_value_of_missing_field_fails() {
    let sprite = Sprite::new();
    let err = sprite.value_of("nope").unwrap_err();
    assert!(matches!(err, crate::Error::NoSuchField { .. }));
    assert!(sprite.raw_value_of::<i64>("nope").is_err());
}

#[test]
fn test_raw_value_type_mismatch() {
    let sprite = Sprite::new().with("name", "Ada");
    let err = sprite.raw_value_of::<bool>("name").unwrap_err();
    assert!(matches!(err, crate::Error::ValueType { expected: "boolean", .. }));
}

#[test]
fn test_introspection() {
    let mut sprite = Sprite::new();
    sprite.add("one", 1).add("two", 1).add("two", 2);

    assert!(sprite.is_single_value("one"));
    assert!(sprite.is_multi_value("two"));
    assert!(!sprite.is_multi_value("missing"));
    assert_eq!(sprite.size_of("two"), 2);
    assert!(sprite.has_value("two", &Value::from(2)));
    assert!(sprite.has_not_value("two", &Value::from(3)));
    assert_eq!(
        sprite.fields_matching(&Regex::new("^t").unwrap()),
        set(&["two"])
    );
    assert_eq!(
        sprite.values_matching(&Regex::new("o").unwrap()),
        vec!["1", "1", "2"]
    );
    assert_eq!(sprite.raw_values_of::<i64>("two").unwrap(), vec![1, 2]);
}

#[test]
fn test_projections() {
    let mut sprite = Sprite::new();
    sprite.add("n", 1).add("n", 2).add("s", "x");

    let map = sprite.as_map();
    assert_eq!(map["n"], Value::Int(1));

    let strings = sprite.as_string_map();
    assert_eq!(strings["n"], "1");
    assert_eq!(strings["s"], "x");

    assert_eq!(sprite.as_multimap()["n"].len(), 2);
    assert_eq!(sprite.entries().count(), 3);
}

// ============================================================================
// Equality
// ============================================================================

#[test]
fn test_value_equality_and_hashing() {
    let a = Sprite::new().with("x", 1).with("y", "b");
    let b = Sprite::new().with("y", "b").with("x", 1);
    let c = Sprite::new().with("x", 2);

    assert_eq!(a, b);
    assert_ne!(a, c);

    let unique: HashSet<Sprite> = vec![a.clone(), b, c].into_iter().collect();
    assert_eq!(unique.len(), 2);
    assert_eq!(a.to_string(), "Sprite{x=[1], y=[b]}");
}

// ============================================================================
// Players
// ============================================================================

#[test]
fn test_play_batch_respects_accept() {
    let mut player = FilteringPlayer::new(CollectingPlayer::new(), |s: &Sprite| {
        s.has_field("keep")
    });

    let played = play_batch(
        &mut player,
        vec![Sprite::new().with("keep", 1), Sprite::new().with("skip", 1)],
    )
    .unwrap();

    assert_eq!(played, 1);
    assert_eq!(player.processed(), 1);
    let inner = player.into_inner();
    assert_eq!(inner.begins(), 1);
    assert_eq!(inner.ends(), 1);
}

#[test]
fn test_players_tolerate_repeated_end() {
    let mut collecting = CollectingPlayer::new();
    play_batch(&mut collecting, vec![Sprite::new().with("a", 1)]).unwrap();
    play_batch(&mut collecting, vec![Sprite::new().with("a", 2)]).unwrap();
    collecting.end().unwrap();

    assert_eq!(collecting.ends(), 3);
    assert_eq!(collecting.processed(), 2);

    let mut tracing_player = TracingPlayer::new("test");
    tracing_player.end().unwrap();
    tracing_player.end().unwrap();
    assert_eq!(tracing_player.processed(), 0);
}

#[test]
fn test_json_lines_player() {
    let mut player = JsonLinesPlayer::new(Vec::new());
    play_batch(
        &mut player,
        vec![
            Sprite::new().with("a", 1),
            Sprite::new().with("b", "x").with("b", "y"),
        ],
    )
    .unwrap();
    player.end().unwrap();

    assert_eq!(player.processed(), 2);
    let output = String::from_utf8(player.into_inner()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, vec![r#"{"a":[1]}"#, r#"{"b":["x","y"]}"#]);
}
