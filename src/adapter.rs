//! # Adapter Capabilities
//!
//! The surface the orchestration framework programs against, split into
//! three capability traits:
//!
//! | Trait | Covers |
//! |-------|--------|
//! | `RelationOps` | index config parsing, index reconciliation, relation SQL helpers |
//! | `ConnectionOps` | acquiring, using, cancelling and releasing connections |
//! | `ConstraintRendering` | contract constraints → DDL fragments |
//!
//! [`HanaAdapter`] implements all three. It is only ever constructed through
//! [`create_adapter`]; there is no discovery or global registration.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as Json;

use crate::connection::{
    CancelHandle, Connection, ConnectionManager, Credentials, EventSink, ExecuteOptions,
    QueryResponse, PROBE_STATEMENT,
};
use crate::constraints;
use crate::driver::Driver;
use crate::index::{self, IndexChange, IndexConfig};
use crate::model::column::missing_columns;
use crate::model::{
    Column, ColumnConstraint, ConstraintKind, ConstraintSupport, ModelConstraint, RawColumn,
    Relation, Value,
};
use crate::sql;
use crate::tx::TxMode;
use crate::Result;

/// Adapter type name the framework uses in profiles.
pub const ADAPTER_TYPE: &str = Credentials::TYPE;

// ============================================================================
// RelationOps
// ============================================================================

pub trait RelationOps {
    fn parse_index(&self, raw: &Json) -> Result<Option<IndexConfig>> {
        IndexConfig::parse(raw)
    }

    /// Ordered drop-then-create changes from `existing` to `desired`.
    fn index_changes(&self, existing: &[IndexConfig], desired: &[IndexConfig]) -> Result<Vec<IndexChange>> {
        index::reconcile(existing, desired)
    }

    fn index_change_sql(&self, relation: &Relation, change: &IndexChange) -> Result<String> {
        index::sql::change_sql(relation, change, Utc::now())
    }

    fn render_relation(&self, relation: &Relation) -> String {
        relation.render()
    }

    fn quote(&self, identifier: &str) -> String {
        sql::quote(identifier)
    }

    fn date_function(&self) -> &'static str {
        sql::date_function()
    }

    fn timestamp_add_sql(&self, add_to: &str, number: i64, interval: &str) -> Result<String> {
        sql::timestamp_add_sql(add_to, number, interval)
    }

    fn rows_different_sql(
        &self,
        relation_a: &Relation,
        relation_b: &Relation,
        column_names: &[String],
        except_operator: &str,
    ) -> String {
        sql::rows_different_sql(relation_a, relation_b, column_names, except_operator)
    }

    fn missing_columns<'a>(&self, from: &'a [Column], to: &[Column]) -> Vec<&'a Column> {
        missing_columns(from, to)
    }

    fn quote_seed_column(&self, column: &str, quote_config: Option<&Json>) -> Result<String> {
        sql::quote_seed_column(column, quote_config)
    }

    fn standardize_grants(&self, rows: &[(String, String)]) -> BTreeMap<String, Vec<String>> {
        sql::standardize_grants(rows.iter().map(|(g, p)| (g.as_str(), p.as_str())))
    }

    fn valid_incremental_strategies(&self) -> &'static [&'static str] {
        sql::INCREMENTAL_STRATEGIES
    }
}

// ============================================================================
// ConnectionOps
// ============================================================================

#[async_trait]
pub trait ConnectionOps {
    type Handle: Send;

    /// A named, opened connection for one worker.
    async fn acquire(&self, name: &str) -> Result<Self::Handle>;

    async fn execute(
        &self,
        handle: &mut Self::Handle,
        sql: &str,
        bindings: &[Value],
        opts: &ExecuteOptions,
    ) -> Result<QueryResponse>;

    /// Run a framework-issued statement. Bare `BEGIN` is skipped because the
    /// database demarcates transactions itself.
    async fn add_query(
        &self,
        handle: &mut Self::Handle,
        sql: &str,
        bindings: &[Value],
        abridge_log: bool,
    ) -> Result<Option<QueryResponse>> {
        if is_bare_begin(sql) {
            tracing::debug!("BEGIN statement skipped; HANA does not require it");
            return Ok(None);
        }
        let opts = ExecuteOptions { auto_begin: false, limit: None, abridge_log };
        self.execute(handle, sql, bindings, &opts).await.map(Some)
    }

    /// Run the probe on an open connection.
    async fn debug_query(&self, handle: &mut Self::Handle) -> Result<()> {
        self.execute(handle, PROBE_STATEMENT, &[], &ExecuteOptions::default())
            .await
            .map(|_| ())
    }

    async fn commit(&self, handle: &mut Self::Handle) -> Result<()>;

    async fn release(&self, handle: &mut Self::Handle) -> Result<()>;

    fn cancel_handle(&self, handle: &Self::Handle) -> Option<CancelHandle>;

    fn is_cancelable(&self) -> bool {
        true
    }
}

fn is_bare_begin(sql: &str) -> bool {
    let stmt = sql.trim().trim_end_matches(';').trim();
    stmt.eq_ignore_ascii_case("begin") || stmt.eq_ignore_ascii_case("begin transaction")
}

// ============================================================================
// ConstraintRendering
// ============================================================================

pub trait ConstraintRendering {
    fn constraint_support(&self, kind: ConstraintKind) -> ConstraintSupport {
        constraints::constraint_support(kind)
    }

    fn render_column_constraint(&self, constraint: &ColumnConstraint) -> Option<String> {
        constraints::render_column_constraint(constraint)
    }

    fn render_raw_columns_constraints(&self, columns: &[RawColumn]) -> Vec<String> {
        constraints::render_raw_columns_constraints(columns)
    }

    fn render_model_constraint(&self, constraint: &ModelConstraint, columns: &[RawColumn]) -> Option<String> {
        constraints::render_model_constraint(constraint, columns)
    }

    fn render_raw_model_constraints(&self, constraints: &[ModelConstraint], columns: &[RawColumn]) -> Vec<String> {
        constraints::render_raw_model_constraints(constraints, columns)
    }

    /// Column names only, quoted where the contract asks for it.
    fn render_raw_columns_names(&self, columns: &[RawColumn]) -> Vec<String> {
        columns
            .iter()
            .map(|c| if c.quote { sql::quote(&c.name) } else { c.name.clone() })
            .collect()
    }
}

// ============================================================================
// HanaAdapter
// ============================================================================

/// The HANA Cloud adapter over a concrete driver.
pub struct HanaAdapter<D: Driver> {
    connections: ConnectionManager<D>,
}

/// Build an adapter. Credentials are resolved and validated here, so a bad
/// profile fails before any connection is attempted.
pub fn create_adapter<D: Driver>(
    credentials: Credentials,
    driver: D,
    sink: Arc<dyn EventSink>,
) -> Result<HanaAdapter<D>> {
    let credentials = credentials.resolve()?;
    tracing::info!(
        adapter = ADAPTER_TYPE,
        host = credentials.unique_field().unwrap_or("<unset>"),
        schema = credentials.schema.as_deref().unwrap_or("<unset>"),
        "adapter created"
    );
    Ok(HanaAdapter { connections: ConnectionManager::new(driver, credentials, sink) })
}

impl<D: Driver> HanaAdapter<D> {
    /// Use explicit transactions instead of auto-commit for connections
    /// acquired from now on.
    pub fn with_tx_mode(mut self, mode: TxMode) -> Self {
        self.connections = self.connections.with_tx_mode(mode);
        self
    }

    pub fn connections(&self) -> &ConnectionManager<D> {
        &self.connections
    }
}

impl<D: Driver> RelationOps for HanaAdapter<D> {}

impl<D: Driver> ConstraintRendering for HanaAdapter<D> {}

#[async_trait]
impl<D: Driver> ConnectionOps for HanaAdapter<D> {
    type Handle = Connection<D>;

    async fn acquire(&self, name: &str) -> Result<Connection<D>> {
        self.connections.connect(name).await
    }

    async fn execute(
        &self,
        handle: &mut Connection<D>,
        sql: &str,
        bindings: &[Value],
        opts: &ExecuteOptions,
    ) -> Result<QueryResponse> {
        handle.execute(sql, bindings, opts).await
    }

    async fn commit(&self, handle: &mut Connection<D>) -> Result<()> {
        handle.commit().await
    }

    async fn release(&self, handle: &mut Connection<D>) -> Result<()> {
        handle.close().await
    }

    fn cancel_handle(&self, handle: &Connection<D>) -> Option<CancelHandle> {
        handle.cancel_handle()
    }
}
