//! End-to-end tests for index management.
//!
//! Raw model config → parse → reconcile against observed catalog rows →
//! DDL, the path a materialization takes when a table's indexes change.

use chrono::{TimeZone, Utc};
use hana_cloud_adapter::index::sql::change_sql;
use hana_cloud_adapter::index::reconcile;
use hana_cloud_adapter::{ChangeAction, IndexChange, IndexConfig, IndexMethod, Relation};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn idx(cols: &[&str], unique: bool, method: IndexMethod) -> IndexConfig {
    IndexConfig::new(cols.iter().copied(), unique, method).unwrap()
}

fn parse_all(raw: serde_json::Value) -> Vec<IndexConfig> {
    raw.as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| IndexConfig::parse(entry).unwrap())
        .collect()
}

// ============================================================================
// 1. Config → observed → DDL
// ============================================================================

#[test]
fn test_redefined_index_drops_before_create() {
    let existing = vec![
        IndexConfig::from_observed_row("IDX_OLD", "ID", false, "BTREE").unwrap(),
        IndexConfig::from_observed_row("IDX_KEEP", "REGION, CREATED_AT", true, "CPBTREE").unwrap(),
    ];
    let desired = parse_all(json!([
        {"columns": ["created_at", "region"], "unique": true, "type": "cpbtree"},
        {"columns": ["id"], "unique": true},
    ]));

    let changes = reconcile(&existing, &desired).unwrap();
    let actions: Vec<_> = changes.iter().map(|c| c.action).collect();
    assert_eq!(actions, vec![ChangeAction::Drop, ChangeAction::Create]);
    assert_eq!(changes[0].context.name, "IDX_OLD");
    assert!(changes[1].context.unique);

    let rel = Relation::new("ANALYTICS", "ORDERS");
    let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    let sql: Vec<String> = changes.iter().map(|c| change_sql(&rel, c, now).unwrap()).collect();
    assert_eq!(sql[0], "drop index ANALYTICS.\"IDX_OLD\"");
    assert!(sql[1].starts_with("create unique BTREE index \""));
    assert!(sql[1].ends_with("\" on ANALYTICS.ORDERS (id)"));
}

#[test]
fn test_pure_additions_and_removals() {
    let a = idx(&["a"], false, IndexMethod::Btree);
    let b = idx(&["b"], false, IndexMethod::InvertedHash);

    let added = reconcile(&[], &[a.clone(), b.clone()]).unwrap();
    assert!(added.iter().all(|c| c.action == ChangeAction::Create));
    assert_eq!(added.len(), 2);

    let removed = reconcile(&[a.with_name("IA"), b.with_name("IB")], &[]).unwrap();
    assert!(removed.iter().all(|c| c.action == ChangeAction::Drop));
    assert_eq!(removed.len(), 2);
}

#[test]
fn test_method_or_uniqueness_change_is_a_new_index() {
    let existing = vec![idx(&["a"], false, IndexMethod::Btree).with_name("I1")];
    let changes = reconcile(&existing, &[idx(&["a"], false, IndexMethod::Cpbtree)]).unwrap();
    assert_eq!(changes.len(), 2);

    let changes = reconcile(&existing, &[idx(&["a"], true, IndexMethod::Btree)]).unwrap();
    assert_eq!(changes.len(), 2);
}

#[test]
fn test_null_entries_are_skipped() {
    let desired = parse_all(json!([null, {"columns": ["a"]}]));
    assert_eq!(desired.len(), 1);
    assert_eq!(desired[0].method, IndexMethod::Btree);
}

// ============================================================================
// 2. Invalid descriptors
// ============================================================================

#[test]
fn test_invalid_descriptors_are_rejected() {
    let cases = [
        (json!({"unique": true}), "'columns' is a required property"),
        (json!({"columns": "a"}), "is not of type 'array'"),
        (json!({"columns": [1]}), "is not of type 'string'"),
        (json!({"columns": ["a"], "unique": "yes"}), "is not of type 'boolean'"),
        (json!({"columns": ["a"], "type": "NOT_A_METHOD"}), "unknown index type \"NOT_A_METHOD\""),
        (json!({"columns": []}), "at least one column"),
        (json!(["a"]), "Expected a dictionary"),
    ];
    for (raw, expected) in cases {
        let err = IndexConfig::parse(&raw).unwrap_err();
        assert!(err.is_configuration(), "{raw}: {err}");
        assert!(err.to_string().contains(expected), "{raw}: {err}");
    }
}

#[test]
fn test_serialized_nameless_drop_is_refused() {
    let raw = json!({"action": "drop", "context": {"name": "", "columns": ["id"]}});
    let err = IndexChange::from_json(&raw).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("drop an index with no name"));

    assert!(serde_json::from_value::<IndexChange>(json!({
        "action": "drop",
        "context": {"name": "", "columns": []}
    }))
    .is_err());

    let valid = IndexChange::from_json(&json!({"action": "drop", "context": {"name": "IX", "columns": ["id"]}})).unwrap();
    let sql = change_sql(&Relation::new("S", "T"), &valid, Utc::now()).unwrap();
    assert_eq!(sql, "drop index S.\"IX\"");
}

#[test]
fn test_drop_without_name_is_refused() {
    let unnamed = idx(&["a"], false, IndexMethod::Btree);
    let err = reconcile(&[unnamed], &[]).unwrap_err();
    assert!(err.to_string().contains("drop an index with no name"));
}

// ============================================================================
// 3. Properties
// ============================================================================

fn arb_index() -> impl Strategy<Value = IndexConfig> {
    (
        proptest::collection::vec("[a-c]", 1..4),
        any::<bool>(),
        proptest::sample::select(IndexMethod::ALL.to_vec()),
        "[A-Z]{3,6}",
    )
        .prop_map(|(cols, unique, method, name)| {
            IndexConfig::new(cols, unique, method).unwrap().with_name(name)
        })
}

fn shuffle_case(index: &IndexConfig) -> IndexConfig {
    let mut cols: Vec<String> = index.columns.iter().map(|c| c.to_uppercase()).collect();
    cols.reverse();
    IndexConfig::new(cols, index.unique, index.method).unwrap()
}

proptest! {
    #[test]
    fn prop_reconcile_against_self_is_empty(indexes in proptest::collection::vec(arb_index(), 0..6)) {
        prop_assert!(reconcile(&indexes, &indexes).unwrap().is_empty());
    }

    #[test]
    fn prop_names_order_and_case_never_matter(indexes in proptest::collection::vec(arb_index(), 0..6)) {
        let desired: Vec<IndexConfig> = indexes.iter().map(shuffle_case).collect();
        prop_assert!(reconcile(&indexes, &desired).unwrap().is_empty());
    }

    #[test]
    fn prop_drops_precede_creates(
        existing in proptest::collection::vec(arb_index(), 0..6),
        desired in proptest::collection::vec(arb_index(), 0..6),
    ) {
        let changes = reconcile(&existing, &desired).unwrap();
        let first_create = changes.iter().position(|c| c.action == ChangeAction::Create);
        if let Some(pos) = first_create {
            prop_assert!(changes[pos..].iter().all(|c| c.action == ChangeAction::Create));
        }
    }

    #[test]
    fn prop_applying_changes_converges(
        existing in proptest::collection::vec(arb_index(), 0..6),
        desired in proptest::collection::vec(arb_index(), 0..6),
    ) {
        let changes = reconcile(&existing, &desired).unwrap();
        let mut after: Vec<IndexConfig> = existing
            .iter()
            .filter(|e| !changes.iter().any(|c| c.action == ChangeAction::Drop && &c.context == *e))
            .cloned()
            .collect();
        after.extend(
            changes
                .iter()
                .filter(|c| c.action == ChangeAction::Create)
                .map(|c| c.context.clone().with_name("NEW")),
        );
        prop_assert!(reconcile(&after, &desired).unwrap().is_empty());
    }
}

#[test]
fn test_generated_names_differ_over_time() {
    let rel = Relation::new("S", "T");
    let index = idx(&["a"], false, IndexMethod::Btree);
    let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 1).unwrap();
    assert_eq!(index.render_name(&rel, t1), index.render_name(&rel, t1));
    assert_ne!(index.render_name(&rel, t1), index.render_name(&rel, t2));
    assert_eq!(index.render_name(&rel, t1).len(), 32);
}
