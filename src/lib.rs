//! # hana-cloud-adapter: SAP HANA Cloud adapter core
//!
//! Everything an ELT orchestration framework needs to run models against
//! SAP HANA Cloud, minus the vendor client library itself.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `Driver` is the contract between the connection lifecycle and the wire
//! 2. **Clean DTOs**: `Relation`, `Column`, `IndexConfig`, `Value` cross all boundaries
//! 3. **Reconciliation is pure**: existing + desired indexes → ordered changes, no I/O
//! 4. **One connection, one worker**: only cancellation crosses threads
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hana_cloud_adapter::{
//!     create_adapter, ConnectionOps, Credentials, ExecuteOptions, MemoryDriver, TracingEventSink,
//! };
//!
//! # async fn example() -> hana_cloud_adapter::Result<()> {
//! let credentials = Credentials::from_json(serde_json::json!({
//!     "host": "abc.hana.prod.example.com",
//!     "port": 443,
//!     "user": "DBT",
//!     "password": "secret",
//!     "schema": "ANALYTICS",
//! }))?;
//! let adapter = create_adapter(credentials, MemoryDriver::new(), Arc::new(TracingEventSink))?;
//!
//! let mut conn = adapter.acquire("model.orders").await?;
//! let response = adapter
//!     .execute(&mut conn, "select * from ORDERS", &[], &ExecuteOptions::default())
//!     .await?;
//! println!("{response}");
//! adapter.release(&mut conn).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Drivers
//!
//! | Driver | Description |
//! |--------|-------------|
//! | `MemoryDriver` | Scriptable in-process driver for testing and dry runs |
//! | (external) | Any `Driver` impl wrapping a real HANA client |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod index;
pub mod tx;
pub mod driver;
pub mod connection;
pub mod constraints;
pub mod sql;
pub mod adapter;
pub mod logging;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Column, ColumnConstraint, ConstraintKind, ConstraintSupport, ModelConstraint, RawColumn,
    Relation, RelationType, Value,
};

// ============================================================================
// Re-exports: Indexes
// ============================================================================

pub use index::{ChangeAction, IndexChange, IndexConfig, IndexKey, IndexMethod};

// ============================================================================
// Re-exports: Connections
// ============================================================================

pub use connection::{
    AdapterEvent, CancelHandle, Connection, ConnectionManager, ConnectionState, Credentials,
    EventSink, ExecuteOptions, Outcome, QueryResponse, RecordingEventSink, TracingEventSink,
};
pub use driver::{Canceller, ConnectParams, Driver, DriverError, MemoryDriver, Session};
pub use tx::TxMode;

// ============================================================================
// Re-exports: Adapter surface
// ============================================================================

pub use adapter::{
    create_adapter, ConnectionOps, ConstraintRendering, HanaAdapter, RelationOps, ADAPTER_TYPE,
};

// ============================================================================
// Error Types
// ============================================================================

/// Which side a failed statement blames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The database rejected the statement.
    Database,
    /// Anything else: driver bug, network, programming error.
    Unexpected,
}

impl std::fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database => f.write_str("Database error"),
            Self::Unexpected => f.write_str("Unexpected error"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("{kind}: {message}")]
    Query { kind: QueryErrorKind, message: String },

    #[error("Cancellation error: {0}")]
    Cancellation(String),
}

impl Error {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    pub fn is_query(&self) -> bool {
        matches!(self, Error::Query { .. })
    }

    /// True only for statements the database itself rejected.
    pub fn is_database(&self) -> bool {
        matches!(self, Error::Query { kind: QueryErrorKind::Database, .. })
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancellation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
