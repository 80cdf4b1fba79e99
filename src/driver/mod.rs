//! # Driver Trait
//!
//! The contract between the connection lifecycle and the vendor client
//! library. Everything the adapter needs from a HANA session is here; all
//! native error types stop at this seam as [`DriverError`].
//!
//! ## Implementations
//!
//! | Driver | Module | Description |
//! |--------|--------|-------------|
//! | `MemoryDriver` | `memory` | Scriptable in-process driver for tests and dry runs |

pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::Value;

pub use memory::MemoryDriver;

// ============================================================================
// Connect parameters
// ============================================================================

/// Everything a driver needs to establish one session.
#[derive(Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub schema: String,
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("schema", &self.schema)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

// ============================================================================
// Driver errors
// ============================================================================

/// Origin of a driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// The database rejected the request and returned an error code.
    Database { code: i32 },
    /// Anything else: I/O, protocol, client-side faults.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn database(code: i32, message: impl Into<String>) -> Self {
        Self { kind: DriverErrorKind::Database { code }, message: message.into() }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self { kind: DriverErrorKind::Other, message: message.into() }
    }

    pub fn is_database(&self) -> bool {
        matches!(self.kind, DriverErrorKind::Database { .. })
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

// ============================================================================
// Statement outcome
// ============================================================================

/// What the driver reports after a statement ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementOutcome {
    /// Affected-row count; `None` or negative when the driver has none.
    pub rowcount: Option<i64>,
}

impl StatementOutcome {
    pub fn rows(n: i64) -> Self {
        Self { rowcount: Some(n) }
    }

    pub fn rows_affected(&self) -> u64 {
        self.rowcount.map_or(0, |n| n.max(0) as u64)
    }
}

// ============================================================================
// Driver / Session / Canceller
// ============================================================================

/// Factory for sessions.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    type Session: Session;

    /// Establish a session. Timeouts are applied by the caller.
    async fn connect(&self, params: &ConnectParams) -> DriverResult<Self::Session>;
}

/// One physical database session. Owned by a single task.
#[async_trait]
pub trait Session: Send + 'static {
    async fn execute(&mut self, sql: &str, bindings: &[Value]) -> DriverResult<StatementOutcome>;

    async fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()>;

    async fn commit(&mut self) -> DriverResult<()>;

    async fn rollback(&mut self) -> DriverResult<()>;

    /// Release the native resource. Must tolerate being called twice.
    async fn close(&mut self) -> DriverResult<()>;

    /// A handle that can abort the statement running on this session from
    /// another thread.
    fn canceller(&self) -> Arc<dyn Canceller>;
}

/// Cross-thread statement abort. Signals and returns; does not wait for the
/// statement to stop.
pub trait Canceller: Send + Sync {
    fn cancel(&self) -> DriverResult<()>;
}
