//! The scenario battery.
//!
//! Every scenario starts from an empty store; the runner's after-each hook
//! clears it again. Values are written as JSON strings so the decoded values
//! can be compared exactly.

use std::sync::Arc;

use fannypack::{KeyRange, Store};
use serde_json::{Value, json};

use crate::assert::assert_yields;
use crate::ensure_eq;
use crate::error::{ConformanceError, Result};
use crate::runner::{TestRunner, test_fn};

/// Ranges over the keys `a`, `b`, `c` with the keys each must yield.
const RANGE_CASES: &[(&str, &[&str])] = &[
    (r#"{"gt":"a"}"#, &["b", "c"]),
    (r#"{"gt":"b"}"#, &["c"]),
    (r#"{"gt":"c"}"#, &[]),
    (r#"{"gte":"a"}"#, &["a", "b", "c"]),
    (r#"{"gte":"b"}"#, &["b", "c"]),
    (r#"{"gte":"c"}"#, &["c"]),
    (r#"{"lt":"a"}"#, &[]),
    (r#"{"lt":"b"}"#, &["a"]),
    (r#"{"lt":"c"}"#, &["a", "b"]),
    (r#"{"lte":"a"}"#, &["a"]),
    (r#"{"lte":"b"}"#, &["a", "b"]),
    (r#"{"lte":"c"}"#, &["a", "b", "c"]),
    (r#"{"gt":"a","lt":"c"}"#, &["b"]),
    (r#"{"gt":"b","lt":"c"}"#, &[]),
    (r#"{"gte":"a","lte":"c"}"#, &["a", "b", "c"]),
    (r#"{"gte":"b","lte":"c"}"#, &["b", "c"]),
    (r#"{"gte":"c","lte":"c"}"#, &["c"]),
];

/// Ranges whose bounds fall between or beyond the keys `a`, `b`, `c`.
const BETWEEN_CASES: &[(&str, &[&str])] = &[
    (r#"{"lte":"bb"}"#, &["a", "b"]),
    (r#"{"gte":"0","lte":"a0"}"#, &["a"]),
    (r#"{"gt":"bb"}"#, &["c"]),
    (r#"{"gte":"d"}"#, &[]),
    (r#"{"gt":"c","lte":"a"}"#, &[]),
    (r#"{"lt":""}"#, &[]),
    (r#"{"lte":""}"#, &[]),
    (r#"{"gte":""}"#, &["a", "b", "c"]),
    (r#"{"gt":""}"#, &["a", "b", "c"]),
];

/// Registers the whole battery against `store`.
pub fn register(runner: &mut dyn TestRunner, store: Arc<dyn Store>) {
    {
        let store = store.clone();
        runner.after_each(
            "Clear Data",
            test_fn(move || {
                let store = store.clone();
                async move { store.clear().await.map_err(ConformanceError::from) }
            }),
        );
    }

    macro_rules! scenario {
        ($name:expr, $body:path) => {{
            let store = store.clone();
            runner.add_test($name, test_fn(move || $body(store.clone())));
        }};
    }

    scenario!(".set()", set);
    scenario!(".get() - basics", get_basics);
    scenario!(".get() - clones", get_clones);
    scenario!(".has()", has);
    scenario!(".has() - null", has_null);
    scenario!(".clear()", clear);
    scenario!(".delete() - basics", delete_basics);
    scenario!(".delete() - unset", delete_unset);
    scenario!("empty key", empty_key);
    scenario!(".keys() - basics", keys_basics);
    scenario!(".keys() - sort order", keys_sort_order);
    scenario!(".keys() - ranges", keys_ranges);
    scenario!(".keys() - bounds between keys", keys_between);
    scenario!(".keys() - restartable", keys_restartable);
    scenario!(".values() - basics", values_basics);
    scenario!(".values() - sort order", values_sort_order);
    scenario!(".values() - ranges", values_ranges);
    scenario!(".entries() - basics", entries_basics);
    scenario!(".entries() - sort order", entries_sort_order);
    scenario!(".entries() - ranges", entries_ranges);
}

/// Stores that share one physical keyspace.
///
/// `extended`'s name must start with `primary`'s name (e.g. `a` and `a2`),
/// and `unrelated` must sort after both (e.g. `b`).
#[derive(Clone)]
pub struct Siblings {
    pub primary: Arc<dyn Store>,
    pub extended: Arc<dyn Store>,
    pub unrelated: Arc<dyn Store>,
}

impl Siblings {
    fn all(&self) -> [&Arc<dyn Store>; 3] {
        [&self.primary, &self.extended, &self.unrelated]
    }
}

/// Registers the namespace isolation scenarios against `siblings`.
pub fn register_isolation(runner: &mut dyn TestRunner, siblings: Siblings) {
    {
        let siblings = siblings.clone();
        runner.after_each(
            "Clear Siblings",
            test_fn(move || clear_siblings(siblings.clone())),
        );
    }
    {
        let siblings = siblings.clone();
        runner.add_test(
            "namespaces - isolated ranges",
            test_fn(move || isolated_ranges(siblings.clone())),
        );
    }
    runner.add_test(
        "namespaces - isolated clear",
        test_fn(move || isolated_clear(siblings.clone())),
    );
}

async fn clear_siblings(siblings: Siblings) -> Result<()> {
    for store in siblings.all() {
        store.clear().await?;
    }
    Ok(())
}

fn s(value: &str) -> Value {
    json!(value)
}

fn keys(expected: &[&str]) -> Vec<String> {
    expected.iter().map(|k| k.to_string()).collect()
}

fn value_of(key: &str) -> Value {
    match key {
        "a" => s("1"),
        "b" => s("2"),
        "c" => s("3"),
        other => s(other),
    }
}

async fn set_abc(store: &Arc<dyn Store>) -> Result<()> {
    for key in ["a", "b", "c"] {
        store.set(key, &value_of(key)).await?;
    }
    Ok(())
}

async fn set_shuffled(store: &Arc<dyn Store>) -> Result<()> {
    let shuffled = [("c", "3"), ("e", "5"), ("d", "4"), ("a", "1"), ("f", "6"), ("b", "2")];
    for (key, value) in shuffled {
        store.set(key, &s(value)).await?;
    }
    Ok(())
}

fn parse_range(raw: &str) -> Result<KeyRange> {
    Ok(serde_json::from_str(raw)?)
}

async fn set(store: Arc<dyn Store>) -> Result<()> {
    store.set("a", &s("Hello")).await?;
    Ok(())
}

async fn get_basics(store: Arc<dyn Store>) -> Result<()> {
    store.set("a", &s("Hello")).await?;
    store.set("b", &s("World")).await?;
    store.set("c", &s("Linus")).await?;

    ensure_eq!(store.get("a").await?, Some(s("Hello")));
    ensure_eq!(store.get("b").await?, Some(s("World")));
    ensure_eq!(store.get("c").await?, Some(s("Linus")));
    Ok(())
}

async fn get_clones(store: Arc<dyn Store>) -> Result<()> {
    let mut first = json!({ "modified": false });
    store.set("first", &first).await?;

    first["modified"] = json!(true);

    let mut clone = store.get("first").await?;
    ensure_eq!(first, json!({ "modified": true }));
    ensure_eq!(clone, Some(json!({ "modified": false })));

    if let Some(read) = clone.as_mut() {
        read["modified"] = json!("after read");
    }
    ensure_eq!(store.get("first").await?, Some(json!({ "modified": false })));
    Ok(())
}

async fn has(store: Arc<dyn Store>) -> Result<()> {
    store.set("a", &s("1")).await?;
    store.set("b", &s("2")).await?;

    ensure_eq!(store.has("a").await?, true);
    ensure_eq!(store.has("b").await?, true);
    ensure_eq!(store.has("c").await?, false);
    ensure_eq!(store.has("d").await?, false);
    Ok(())
}

async fn has_null(store: Arc<dyn Store>) -> Result<()> {
    ensure_eq!(store.has("missing").await?, false);
    ensure_eq!(store.get("missing").await?, None);

    store.set("missing", &Value::Null).await?;

    ensure_eq!(store.has("missing").await?, true);
    ensure_eq!(store.get("missing").await?, Some(Value::Null));
    Ok(())
}

async fn clear(store: Arc<dyn Store>) -> Result<()> {
    store.set("a", &s("Hello")).await?;
    ensure_eq!(store.get("a").await?, Some(s("Hello")));

    store.clear().await?;
    ensure_eq!(store.get("a").await?, None);
    assert_yields(store.keys(KeyRange::all()).await?, &[]).await
}

async fn delete_basics(store: Arc<dyn Store>) -> Result<()> {
    set_abc(&store).await?;

    ensure_eq!(store.get("a").await?, Some(s("1")));
    ensure_eq!(store.get("b").await?, Some(s("2")));
    ensure_eq!(store.get("c").await?, Some(s("3")));

    store.delete("b").await?;

    ensure_eq!(store.get("a").await?, Some(s("1")));
    ensure_eq!(store.get("b").await?, None);
    ensure_eq!(store.get("c").await?, Some(s("3")));

    store.delete("a").await?;

    ensure_eq!(store.get("a").await?, None);
    ensure_eq!(store.get("b").await?, None);
    ensure_eq!(store.get("c").await?, Some(s("3")));

    store.delete("c").await?;

    ensure_eq!(store.get("a").await?, None);
    ensure_eq!(store.get("b").await?, None);
    ensure_eq!(store.get("c").await?, None);
    Ok(())
}

async fn delete_unset(store: Arc<dyn Store>) -> Result<()> {
    store.delete("a").await?;
    store.delete("a").await?;
    ensure_eq!(store.has("a").await?, false);
    Ok(())
}

async fn empty_key(store: Arc<dyn Store>) -> Result<()> {
    store.set("a", &s("1")).await?;
    store.set("", &s("empty")).await?;

    ensure_eq!(store.get("").await?, Some(s("empty")));
    ensure_eq!(store.has("").await?, true);
    assert_yields(store.keys(KeyRange::all()).await?, &keys(&["", "a"])).await?;
    assert_yields(
        store.keys(KeyRange::builder().lte("").build()?).await?,
        &keys(&[""]),
    )
    .await?;
    assert_yields(
        store.keys(KeyRange::builder().gt("").build()?).await?,
        &keys(&["a"]),
    )
    .await?;

    store.delete("").await?;
    ensure_eq!(store.has("").await?, false);
    assert_yields(store.keys(KeyRange::all()).await?, &keys(&["a"])).await
}

async fn keys_basics(store: Arc<dyn Store>) -> Result<()> {
    set_abc(&store).await?;
    assert_yields(store.keys(KeyRange::all()).await?, &keys(&["a", "b", "c"])).await
}

async fn keys_sort_order(store: Arc<dyn Store>) -> Result<()> {
    set_shuffled(&store).await?;
    assert_yields(
        store.keys(KeyRange::all()).await?,
        &keys(&["a", "b", "c", "d", "e", "f"]),
    )
    .await
}

async fn keys_ranges(store: Arc<dyn Store>) -> Result<()> {
    set_abc(&store).await?;
    check_key_cases(&store, RANGE_CASES).await
}

async fn keys_between(store: Arc<dyn Store>) -> Result<()> {
    set_abc(&store).await?;
    check_key_cases(&store, BETWEEN_CASES).await
}

async fn check_key_cases(store: &Arc<dyn Store>, cases: &[(&str, &[&str])]) -> Result<()> {
    for (raw, expected) in cases {
        let iter = store.keys(parse_range(raw)?).await?;
        assert_yields(iter, &keys(expected))
            .await
            .map_err(|e| e.context(raw))?;
    }
    Ok(())
}

async fn keys_restartable(store: Arc<dyn Store>) -> Result<()> {
    set_abc(&store).await?;

    let mut abandoned = store.keys(KeyRange::all()).await?;
    ensure_eq!(abandoned.next().await?, Some("a".to_string()));
    drop(abandoned);

    assert_yields(store.keys(KeyRange::all()).await?, &keys(&["a", "b", "c"])).await?;
    assert_yields(store.keys(KeyRange::all()).await?, &keys(&["a", "b", "c"])).await
}

async fn values_basics(store: Arc<dyn Store>) -> Result<()> {
    set_abc(&store).await?;
    assert_yields(
        store.values(KeyRange::all()).await?,
        &[s("1"), s("2"), s("3")],
    )
    .await
}

async fn values_sort_order(store: Arc<dyn Store>) -> Result<()> {
    set_shuffled(&store).await?;
    assert_yields(
        store.values(KeyRange::all()).await?,
        &[s("1"), s("2"), s("3"), s("4"), s("5"), s("6")],
    )
    .await
}

async fn values_ranges(store: Arc<dyn Store>) -> Result<()> {
    set_abc(&store).await?;
    for (raw, expected) in RANGE_CASES {
        let values: Vec<Value> = expected.iter().map(|k| value_of(k)).collect();
        assert_yields(store.values(parse_range(raw)?).await?, &values)
            .await
            .map_err(|e| e.context(raw))?;
    }
    Ok(())
}

async fn entries_basics(store: Arc<dyn Store>) -> Result<()> {
    set_abc(&store).await?;
    assert_yields(
        store.entries(KeyRange::all()).await?,
        &entries(&["a", "b", "c"]),
    )
    .await
}

async fn entries_sort_order(store: Arc<dyn Store>) -> Result<()> {
    set_shuffled(&store).await?;
    let expected: Vec<(String, Value)> = ["a", "b", "c", "d", "e", "f"]
        .iter()
        .zip(1..)
        .map(|(k, n)| (k.to_string(), s(&n.to_string())))
        .collect();
    assert_yields(store.entries(KeyRange::all()).await?, &expected).await
}

async fn entries_ranges(store: Arc<dyn Store>) -> Result<()> {
    set_abc(&store).await?;
    for (raw, expected) in RANGE_CASES {
        assert_yields(store.entries(parse_range(raw)?).await?, &entries(expected))
            .await
            .map_err(|e| e.context(raw))?;
    }
    Ok(())
}

fn entries(expected: &[&str]) -> Vec<(String, Value)> {
    expected
        .iter()
        .map(|k| (k.to_string(), value_of(k)))
        .collect()
}

async fn isolated_ranges(siblings: Siblings) -> Result<()> {
    let Siblings {
        primary,
        extended,
        unrelated,
    } = siblings;
    primary.set("k", &s("primary")).await?;
    primary.set("z", &s("primary")).await?;
    extended.set("k", &s("extended")).await?;
    unrelated.set("k", &s("unrelated")).await?;

    assert_yields(primary.keys(KeyRange::all()).await?, &keys(&["k", "z"])).await?;
    assert_yields(
        extended.entries(KeyRange::all()).await?,
        &[("k".to_string(), s("extended"))],
    )
    .await?;
    assert_yields(
        unrelated.values(KeyRange::all()).await?,
        &[s("unrelated")],
    )
    .await?;
    assert_yields(
        primary.entries(parse_range(r#"{"gt":"k"}"#)?).await?,
        &[("z".to_string(), s("primary"))],
    )
    .await?;
    ensure_eq!(extended.has("z").await?, false);
    Ok(())
}

async fn isolated_clear(siblings: Siblings) -> Result<()> {
    for store in siblings.all() {
        store.set("k", &s("present")).await?;
    }

    siblings.primary.clear().await?;

    ensure_eq!(siblings.primary.has("k").await?, false);
    ensure_eq!(siblings.extended.get("k").await?, Some(s("present")));
    ensure_eq!(siblings.unrelated.get("k").await?, Some(s("present")));
    Ok(())
}
