//! End-to-end tests for the adapter surface.
//!
//! Exercises `create_adapter` and the three capability traits the way the
//! orchestration framework calls them.

use std::sync::Arc;

use hana_cloud_adapter::model::type_code_name;
use hana_cloud_adapter::{
    create_adapter, ChangeAction, Column, ColumnConstraint, ConnectionOps, ConstraintKind,
    ConstraintRendering, ConstraintSupport, Credentials, DriverError, ExecuteOptions, HanaAdapter,
    MemoryDriver, ModelConstraint, RawColumn, RecordingEventSink, Relation, RelationOps, TxMode,
    Value, ADAPTER_TYPE,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn adapter(driver: &MemoryDriver) -> HanaAdapter<MemoryDriver> {
    let credentials = Credentials {
        host: Some("localhost".into()),
        port: Some(443),
        user: Some("DBT".into()),
        password: Some("secret".into()),
        schema: Some("ANALYTICS".into()),
        ..Default::default()
    };
    create_adapter(credentials, driver.clone(), Arc::new(RecordingEventSink::new())).unwrap()
}

// ============================================================================
// 1. Construction
// ============================================================================

#[test]
fn test_create_adapter_rejects_incomplete_credentials() {
    let credentials = Credentials { host: Some("h".into()), ..Default::default() };
    let err = create_adapter(credentials, MemoryDriver::new(), Arc::new(RecordingEventSink::new()))
        .err()
        .unwrap();
    assert!(err.is_configuration());
    assert_eq!(
        err.to_string(),
        "Configuration error: One or more required credentials are None: schema, user, password, port"
    );
}

#[test]
fn test_credentials_from_cloud_foundry_binding() {
    let vcap = json!({
        "hana": [{
            "name": "analytics-db",
            "credentials": {
                "host": "cf-host", "port": "443", "user": "CFU", "password": "pw", "schema": "CFS"
            }
        }]
    })
    .to_string();
    let creds = Credentials { cf_service_name: Some("analytics-db".into()), ..Default::default() }
        .resolve_with(Some(&vcap))
        .unwrap();
    assert_eq!(creds.host.as_deref(), Some("cf-host"));
    assert_eq!(creds.port, Some(443));
    assert_eq!(ADAPTER_TYPE, "saphanacloud");
}

// ============================================================================
// 2. ConnectionOps
// ============================================================================

#[tokio::test]
async fn test_acquire_execute_release() {
    let driver = MemoryDriver::new();
    let adapter = adapter(&driver);
    assert!(adapter.is_cancelable());

    let mut conn = adapter.acquire("model.orders").await.unwrap();
    adapter.debug_query(&mut conn).await.unwrap();

    let skipped = adapter.add_query(&mut conn, "BEGIN", &[], false).await.unwrap();
    assert!(skipped.is_none());
    let ran = adapter.add_query(&mut conn, "create table t (a int)", &[], false).await.unwrap();
    assert_eq!(ran.unwrap().to_string(), "OK 0");

    let r = adapter
        .execute(&mut conn, "select 1 from dummy", &[], &ExecuteOptions::default())
        .await
        .unwrap();
    assert_eq!(r.code(), "success");
    assert!(adapter.cancel_handle(&conn).is_some());

    adapter.commit(&mut conn).await.unwrap();
    adapter.release(&mut conn).await.unwrap();
    assert!(adapter.cancel_handle(&conn).is_none());
    assert!(!driver.executed().iter().any(|s| s == "BEGIN"));
}

#[tokio::test]
async fn test_explicit_mode_through_adapter() {
    let driver = MemoryDriver::new();
    let adapter = adapter(&driver).with_tx_mode(TxMode::Explicit);
    let mut conn = adapter.acquire("c").await.unwrap();

    adapter
        .execute(&mut conn, "insert into t values (1)", &[Value::from(1)], &ExecuteOptions::default())
        .await
        .unwrap();
    adapter.commit(&mut conn).await.unwrap();
    assert_eq!(driver.stats().commits, 1);
    assert_eq!(adapter.connections().credentials().schema.as_deref(), Some("ANALYTICS"));
}

#[tokio::test]
async fn test_add_query_failure_rolls_back_earlier_work() {
    let driver = MemoryDriver::new();
    driver.fail_statements_containing("BROKEN", DriverError::database(301, "unique constraint violated"));
    let adapter = adapter(&driver).with_tx_mode(TxMode::Explicit);
    let mut conn = adapter.acquire("model.orders").await.unwrap();

    adapter.add_query(&mut conn, "insert into t values (1)", &[], false).await.unwrap();
    assert!(conn.transaction_open());

    let err = adapter
        .add_query(&mut conn, "insert into BROKEN values (1)", &[], false)
        .await
        .unwrap_err();
    assert!(err.is_database());
    assert_eq!(driver.stats().rollbacks, 1);
    assert!(!conn.transaction_open());

    adapter.add_query(&mut conn, "insert into t values (2)", &[], false).await.unwrap();
    adapter.commit(&mut conn).await.unwrap();
    assert_eq!(driver.stats().commits, 1);
    assert_eq!(driver.stats().rollbacks, 1);
}

#[tokio::test]
async fn test_add_query_in_autocommit_never_rolls_back() {
    let driver = MemoryDriver::new();
    driver.fail_statements_containing("BROKEN", DriverError::other("boom"));
    let adapter = adapter(&driver);
    let mut conn = adapter.acquire("c").await.unwrap();

    adapter.add_query(&mut conn, "insert into t values (1)", &[], false).await.unwrap();
    assert!(!conn.transaction_open());
    assert!(adapter.add_query(&mut conn, "insert into BROKEN values (1)", &[], false).await.is_err());
    assert_eq!(driver.stats().rollbacks, 0);
}

// ============================================================================
// 3. RelationOps
// ============================================================================

#[test]
fn test_index_lifecycle_through_adapter() {
    let adapter = adapter(&MemoryDriver::new());
    let rel = Relation::new("ANALYTICS", "ORDERS");

    let desired = adapter.parse_index(&json!({"columns": ["id"], "type": "inverted_value"})).unwrap();
    let changes = adapter.index_changes(&[], &[desired.unwrap()]).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].action, ChangeAction::Create);
    let sql = adapter.index_change_sql(&rel, &changes[0]).unwrap();
    assert!(sql.starts_with("create INVERTED VALUE index \""));
    assert!(!changes[0].requires_full_refresh());
}

#[test]
fn test_relation_helpers() {
    let adapter = adapter(&MemoryDriver::new());
    assert_eq!(adapter.render_relation(&Relation::new("S", "T")), "S.T");
    assert_eq!(adapter.quote("Mixed"), "\"Mixed\"");
    assert_eq!(adapter.date_function(), "CURRENT_DATE");
    assert_eq!(adapter.timestamp_add_sql("ts", 3, "minute").unwrap(), "ADD_SECONDS(ts, 3 * 60)");
    assert!(adapter.valid_incremental_strategies().contains(&"merge"));
    assert_eq!(adapter.quote_seed_column("c", Some(&json!(true))).unwrap(), "\"c\"");

    let grants = adapter.standardize_grants(&[("A".into(), "SELECT".into()), ("B".into(), "SELECT".into())]);
    assert_eq!(grants["SELECT"], vec!["A".to_string(), "B".to_string()]);

    let from = vec![Column::new("a", "INTEGER"), Column::new("B", "NVARCHAR")];
    let to = vec![Column::new("A", "INTEGER")];
    let missing: Vec<&str> = adapter.missing_columns(&from, &to).iter().map(|c| c.name.as_str()).collect();
    assert_eq!(missing, vec!["B"]);

    assert_eq!(type_code_name(3), "INTEGER");
}

// ============================================================================
// 4. ConstraintRendering
// ============================================================================

#[test]
fn test_contract_ddl_fragments() {
    let adapter = adapter(&MemoryDriver::new());
    assert_eq!(adapter.constraint_support(ConstraintKind::Check), ConstraintSupport::Enforced);

    let columns = vec![
        RawColumn::new("id", "INTEGER")
            .with_constraint(ColumnConstraint::new(ConstraintKind::NotNull))
            .with_constraint(ColumnConstraint::new(ConstraintKind::Check).with_expression("id > 0")),
        RawColumn::new("Region", "NVARCHAR(10)").quoted(),
    ];
    assert_eq!(
        adapter.render_raw_columns_constraints(&columns),
        vec!["id INTEGER not null ,check (id > 0)".to_string(), "\"Region\" NVARCHAR(10)".to_string()]
    );
    assert_eq!(adapter.render_raw_columns_names(&columns), vec!["id".to_string(), "\"Region\"".to_string()]);

    let constraints = vec![
        ModelConstraint::new(ConstraintKind::PrimaryKey, &["id"]),
        ModelConstraint::new(ConstraintKind::Unique, &["Region"]).named("uq_region"),
        ModelConstraint::new(ConstraintKind::NotNull, &["id"]),
    ];
    assert_eq!(
        adapter.render_raw_model_constraints(&constraints, &columns),
        vec!["primary key (id)".to_string(), "constraint uq_region unique (\"Region\")".to_string()]
    );
}
