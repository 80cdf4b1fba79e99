//! # Connection Lifecycle
//!
//! A [`Connection`] is one physical session owned by one worker for its
//! whole life. It moves through a small state machine:
//!
//! ```text
//! Closed --open ok--> Open --close--> Closed
//! Closed --open err-> Failed            (terminal; build a new handle)
//! Open   --execute err--> Open          (rolled back, error surfaced)
//! ```
//!
//! A failed statement never fails the connection. Only `open` can.
//! The one operation that may run from another thread is cancellation,
//! which goes through a detached [`CancelHandle`].

pub mod credentials;
pub mod events;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::driver::{Canceller, Driver, DriverError, DriverErrorKind, Session};
use crate::model::Value;
use crate::tx::{TxMode, TxState};
use crate::{Error, QueryErrorKind, Result};

pub use credentials::Credentials;
pub use events::{AdapterEvent, EventSink, RecordingEventSink, TracingEventSink};

/// Always-available statement used to prove a session works.
pub const PROBE_STATEMENT: &str = "SELECT 1 FROM DUMMY";

/// Statement prefix length kept when a log is abridged.
pub const ABRIDGED_SQL_LEN: usize = 512;

// ============================================================================
// State, options, response
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Closed,
    Open,
    Failed,
}

/// Per-statement execution options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Open a transaction first if none is open (no-op in auto-commit).
    /// In explicit mode any statement that reaches the session marks the
    /// transaction open regardless.
    pub auto_begin: bool,
    /// Row limit appended to read queries.
    pub limit: Option<u64>,
    /// Only the first [`ABRIDGED_SQL_LEN`] characters go to events.
    pub abridge_log: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self { auto_begin: true, limit: None, abridge_log: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Error,
}

/// Summary of one executed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub status_message: String,
    pub rows_affected: u64,
    pub outcome: Outcome,
}

impl QueryResponse {
    pub fn success(rows_affected: u64) -> Self {
        Self {
            status_message: format!("OK {rows_affected}"),
            rows_affected,
            outcome: Outcome::Success,
        }
    }

    /// Short status code the framework records alongside the message.
    pub fn code(&self) -> &'static str {
        match self.outcome {
            Outcome::Success => "success",
            Outcome::Error => "error",
        }
    }
}

impl fmt::Display for QueryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status_message)
    }
}

// ============================================================================
// CancelHandle
// ============================================================================

/// Detached, cloneable cancellation capability for one connection.
#[derive(Clone)]
pub struct CancelHandle {
    conn_name: Arc<str>,
    canceller: Arc<dyn Canceller>,
}

impl CancelHandle {
    /// Ask the session to abort its running statement. Returns immediately.
    pub fn cancel(&self) -> Result<()> {
        info!(conn = %self.conn_name, "canceling query");
        match self.canceller.cancel() {
            Ok(()) => {
                info!(conn = %self.conn_name, "query cancel requested");
                Ok(())
            }
            Err(e) => {
                error!(conn = %self.conn_name, error = %e, "failed to cancel query");
                Err(Error::Cancellation(format!("Failed to cancel query: {e}")))
            }
        }
    }

    pub fn connection_name(&self) -> &str {
        &self.conn_name
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle").field("conn_name", &self.conn_name).finish()
    }
}

// ============================================================================
// Connection
// ============================================================================

/// One database session and its transaction state.
pub struct Connection<D: Driver> {
    name: Arc<str>,
    driver: Arc<D>,
    credentials: Arc<Credentials>,
    sink: Arc<dyn EventSink>,
    state: ConnectionState,
    session: Option<D::Session>,
    canceller: Option<Arc<dyn Canceller>>,
    tx: TxState,
}

impl<D: Driver> Connection<D> {
    /// A closed handle. Nothing touches the network until [`open`](Self::open).
    pub fn new(
        name: impl Into<String>,
        driver: Arc<D>,
        credentials: Arc<Credentials>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            name: Arc::from(name.into()),
            driver,
            credentials,
            sink,
            state: ConnectionState::Closed,
            session: None,
            canceller: None,
            tx: TxState::default(),
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn state(&self) -> ConnectionState { self.state }
    pub fn tx_mode(&self) -> TxMode { self.tx.mode() }
    pub fn transaction_open(&self) -> bool { self.tx.is_open() }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Connect and run the probe. Already-open handles are left untouched.
    pub async fn open(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Open => {
                info!(conn = %self.name, "connection is already open, skipping open");
                return Ok(());
            }
            ConnectionState::Failed => {
                return Err(Error::Connection(format!(
                    "connection '{}' failed earlier; create a new handle to retry",
                    self.name
                )));
            }
            ConnectionState::Closed => {}
        }

        let params = self.credentials.connect_params()?;
        let timeout = params.connect_timeout;

        let connected = tokio::time::timeout(timeout, self.driver.connect(&params)).await;
        let mut session = match connected {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => return Err(self.fail_open(e.message)),
            Err(_) => {
                return Err(self.fail_open(format!(
                    "connect to {}:{} timed out after {}s",
                    params.host,
                    params.port,
                    timeout.as_secs()
                )));
            }
        };

        debug!(conn = %self.name, "testing connection with '{PROBE_STATEMENT}'");
        if let Err(e) = session.execute(PROBE_STATEMENT, &[]).await {
            error!(conn = %self.name, error = %e, "failed during connection test");
            if let Err(close_err) = session.close().await {
                warn!(conn = %self.name, error = %close_err, "closing half-open session failed");
            }
            return Err(self.fail_open(format!("Connection test failed: {e}")));
        }

        if self.tx.mode() == TxMode::Explicit {
            if let Err(e) = session.set_autocommit(false).await {
                if let Err(close_err) = session.close().await {
                    warn!(conn = %self.name, error = %close_err, "closing half-open session failed");
                }
                return Err(self.fail_open(format!("could not leave auto-commit mode: {e}")));
            }
        }

        self.canceller = Some(session.canceller());
        self.session = Some(session);
        self.state = ConnectionState::Open;
        debug!(conn = %self.name, "connection successful");
        Ok(())
    }

    fn fail_open(&mut self, message: String) -> Error {
        error!(conn = %self.name, error = %message, "error connecting to database");
        self.state = ConnectionState::Failed;
        self.session = None;
        self.canceller = None;
        self.tx.end();
        Error::Connection(message)
    }

    /// Re-run the probe. Does not change state on failure; the caller
    /// decides whether to reopen.
    pub async fn check_liveness(&mut self) -> Result<bool> {
        let name = self.name.clone();
        let session = self.session_mut()?;
        match session.execute(PROBE_STATEMENT, &[]).await {
            Ok(_) => {
                debug!(conn = %name, "connection test passed");
                Ok(true)
            }
            Err(e) => {
                error!(conn = %name, error = %e, "connection test failed");
                Err(Error::Connection(format!("Connection test failed: {e}")))
            }
        }
    }

    /// Release the session. Safe to call repeatedly; a failed handle stays
    /// failed.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!(conn = %self.name, error = %e, "error while closing session");
            }
            debug!(conn = %self.name, "connection closed");
        }
        self.canceller = None;
        self.tx.end();
        if self.state != ConnectionState::Failed {
            self.state = ConnectionState::Closed;
        }
        Ok(())
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Switch between auto-commit and explicit transactions. Takes effect
    /// at the next `open` if the handle is not open yet.
    pub async fn set_tx_mode(&mut self, mode: TxMode) -> Result<()> {
        if mode == self.tx.mode() {
            return Ok(());
        }
        if let Some(session) = self.session.as_mut() {
            session
                .set_autocommit(mode == TxMode::AutoCommit)
                .await
                .map_err(translate)?;
        }
        self.tx.set_mode(mode);
        Ok(())
    }

    /// No-op in auto-commit mode. HANA opens transactions implicitly, so
    /// explicit mode only records that one is in progress.
    pub fn begin(&mut self) {
        if self.tx.begin() {
            debug!(conn = %self.name, "transaction opened");
        }
    }

    /// Commit, unless the session is in auto-commit mode where every
    /// statement already committed itself.
    pub async fn commit(&mut self) -> Result<()> {
        if !self.tx.needs_commit() {
            return Ok(());
        }
        let name = self.name.clone();
        self.session_mut()?.commit().await.map_err(translate)?;
        self.tx.end();
        debug!(conn = %name, "transaction committed");
        Ok(())
    }

    /// Roll back an open transaction. Failures are logged and swallowed so
    /// they never mask the error that triggered the rollback.
    pub async fn rollback_if_open(&mut self) {
        if !self.tx.is_open() {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            match session.rollback().await {
                Ok(()) => debug!(conn = %self.name, "transaction rolled back"),
                Err(e) => warn!(conn = %self.name, error = %e, "rollback failed"),
            }
        }
        self.tx.end();
    }

    // ========================================================================
    // Execution
    // ========================================================================

    pub async fn execute(
        &mut self,
        sql: &str,
        bindings: &[Value],
        opts: &ExecuteOptions,
    ) -> Result<QueryResponse> {
        if self.state != ConnectionState::Open {
            return Err(Error::Connection(format!("connection '{}' is not open", self.name)));
        }
        if opts.auto_begin && !self.tx.is_open() {
            self.begin();
        }

        let sql = with_limit(sql, opts.limit);
        let log_sql = if opts.abridge_log { abridge(&sql) } else { sql.clone() };

        self.sink.emit(AdapterEvent::ConnectionUsed {
            conn_type: Credentials::TYPE,
            conn_name: self.name.to_string(),
        });
        self.sink.emit(AdapterEvent::QueryIssued {
            conn_name: self.name.to_string(),
            sql: log_sql.clone(),
            bindings: bindings.iter().map(ToString::to_string).collect(),
        });

        let start = Instant::now();
        let result = self.session_mut()?.execute(&sql, bindings).await;
        let elapsed = start.elapsed();

        // Outside auto-commit the session now holds a transaction whether or
        // not one was begun explicitly; a failure below must roll it back.
        if self.tx.begin() {
            debug!(conn = %self.name, "implicit transaction opened");
        }

        match result {
            Ok(outcome) => {
                let response = QueryResponse::success(outcome.rows_affected());
                self.sink.emit(AdapterEvent::QueryCompleted {
                    conn_name: self.name.to_string(),
                    sql: log_sql,
                    status: response.to_string(),
                    outcome: Outcome::Success,
                    elapsed,
                });
                Ok(response)
            }
            Err(e) => {
                match e.kind {
                    DriverErrorKind::Database { code } => {
                        error!(conn = %self.name, code, error = %e, "SAP HANA error");
                    }
                    DriverErrorKind::Other => {
                        error!(conn = %self.name, sql = %log_sql, error = %e, "error running SQL");
                        info!(conn = %self.name, "rolling back transaction");
                    }
                }
                self.rollback_if_open().await;
                self.sink.emit(AdapterEvent::QueryCompleted {
                    conn_name: self.name.to_string(),
                    sql: log_sql,
                    status: format!("An error occurred: {e}"),
                    outcome: Outcome::Error,
                    elapsed,
                });
                Err(translate(e))
            }
        }
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    /// Handle for aborting this connection's statements from another thread.
    /// `None` until the connection is open.
    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.canceller.as_ref().map(|c| CancelHandle {
            conn_name: self.name.clone(),
            canceller: c.clone(),
        })
    }

    pub fn cancel(&self) -> Result<()> {
        self.cancel_handle()
            .ok_or_else(|| {
                Error::Cancellation(format!("connection '{}' has no open session", self.name))
            })?
            .cancel()
    }

    fn session_mut(&mut self) -> Result<&mut D::Session> {
        let name = &self.name;
        self.session
            .as_mut()
            .ok_or_else(|| Error::Connection(format!("connection '{name}' is not open")))
    }
}

impl<D: Driver> fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("tx", &self.tx)
            .finish()
    }
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Produces named connections that share a driver, credentials and sink.
pub struct ConnectionManager<D: Driver> {
    driver: Arc<D>,
    credentials: Arc<Credentials>,
    sink: Arc<dyn EventSink>,
    tx_mode: TxMode,
}

impl<D: Driver> ConnectionManager<D> {
    pub fn new(driver: D, credentials: Credentials, sink: Arc<dyn EventSink>) -> Self {
        Self {
            driver: Arc::new(driver),
            credentials: Arc::new(credentials),
            sink,
            tx_mode: TxMode::AutoCommit,
        }
    }

    /// Transaction mode for connections created from now on.
    pub fn with_tx_mode(mut self, mode: TxMode) -> Self {
        self.tx_mode = mode;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// A fresh, closed handle.
    pub fn handle(&self, name: impl Into<String>) -> Connection<D> {
        let mut conn = Connection::new(
            name,
            self.driver.clone(),
            self.credentials.clone(),
            self.sink.clone(),
        );
        conn.tx.set_mode(self.tx_mode);
        conn
    }

    /// A fresh handle, opened.
    pub async fn connect(&self, name: impl Into<String>) -> Result<Connection<D>> {
        let mut conn = self.handle(name);
        conn.open().await?;
        Ok(conn)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Map a driver failure to a query error, keeping the original message.
fn translate(e: DriverError) -> Error {
    let kind = if e.is_database() { QueryErrorKind::Database } else { QueryErrorKind::Unexpected };
    Error::Query { kind, message: e.message }
}

/// True for statements whose first keyword is SELECT or WITH. Leading
/// whitespace, parentheses and `--` / `/* */` comments are skipped.
pub fn is_read_query(sql: &str) -> bool {
    let head = skip_leading_noise(sql);
    let keyword: String = head
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    keyword.eq_ignore_ascii_case("select") || keyword.eq_ignore_ascii_case("with")
}

fn skip_leading_noise(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.find('\n').map_or("", |i| &rest[i + 1..]);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.find("*/").map_or("", |i| &rest[i + 2..]);
        } else {
            return sql;
        }
    }
}

/// Append `LIMIT n` to read queries; everything else is returned as is.
pub fn with_limit(sql: &str, limit: Option<u64>) -> String {
    match limit {
        Some(n) if is_read_query(sql) => {
            let body = sql.trim_end().trim_end_matches(';').trim_end();
            format!("{body} LIMIT {n}")
        }
        _ => sql.to_string(),
    }
}

/// First [`ABRIDGED_SQL_LEN`] characters followed by `...` when truncated.
pub fn abridge(sql: &str) -> String {
    match sql.char_indices().nth(ABRIDGED_SQL_LEN) {
        Some((cut, _)) => format!("{}...", &sql[..cut]),
        None => sql.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_limit_only_touches_reads() {
        assert_eq!(with_limit("select * from t;", Some(10)), "select * from t LIMIT 10");
        assert_eq!(with_limit("  WITH x as (select 1 from dummy) select * from x", Some(5)),
                   "  WITH x as (select 1 from dummy) select * from x LIMIT 5");
        assert_eq!(with_limit("(select 1 from dummy)", Some(1)), "(select 1 from dummy) LIMIT 1");
        assert_eq!(with_limit("delete from t", Some(10)), "delete from t");
        assert_eq!(with_limit("select 1 from dummy", None), "select 1 from dummy");
        assert!(!is_read_query("selective_proc()"));
    }

    #[test]
    fn test_read_query_after_leading_comments() {
        assert!(is_read_query("-- note\nselect * from t"));
        assert!(is_read_query("/* header */ (select 1 from dummy)"));
        assert!(is_read_query("  -- a\n  /* b */\n  -- c\n WITH x as (select 1 from dummy) select * from x"));
        assert!(!is_read_query("-- select\ndelete from t"));
        assert!(!is_read_query("/* unterminated select"));
        assert!(!is_read_query("-- only a comment"));
        assert_eq!(
            with_limit("-- note\nselect * from t", Some(2)),
            "-- note\nselect * from t LIMIT 2"
        );
    }

    #[test]
    fn test_abridge() {
        let long = "x".repeat(600);
        let cut = abridge(&long);
        assert_eq!(cut.len(), ABRIDGED_SQL_LEN + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(abridge("select 1"), "select 1");

        let wide = "é".repeat(600);
        assert_eq!(abridge(&wide).chars().count(), ABRIDGED_SQL_LEN + 3);
    }

    #[test]
    fn test_success_response() {
        let r = QueryResponse::success(4);
        assert_eq!(r.to_string(), "OK 4");
        assert_eq!(r.code(), "success");
    }
}
