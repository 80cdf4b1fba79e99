//! Instrumentation events emitted around statement execution.
//!
//! Events are fire-and-forget: a sink can never influence control flow.

use std::time::Duration;

use parking_lot::Mutex;

use super::Outcome;

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    /// A named connection was picked up to run a statement.
    ConnectionUsed { conn_type: &'static str, conn_name: String },
    /// A statement is about to be sent. `sql` may be abridged; `bindings`
    /// are the bound values rendered as SQL literals, in position order.
    QueryIssued { conn_name: String, sql: String, bindings: Vec<String> },
    /// A statement finished, successfully or not.
    QueryCompleted {
        conn_name: String,
        sql: String,
        status: String,
        outcome: Outcome,
        elapsed: Duration,
    },
}

/// Consumer of [`AdapterEvent`]s (telemetry, structured logs, test probes).
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AdapterEvent);
}

/// Forwards events to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: AdapterEvent) {
        match event {
            AdapterEvent::ConnectionUsed { conn_type, conn_name } => {
                tracing::debug!(conn_type, conn = %conn_name, "connection used");
            }
            AdapterEvent::QueryIssued { conn_name, sql, bindings } => {
                tracing::debug!(conn = %conn_name, %sql, bindings = ?bindings, "sql query");
            }
            AdapterEvent::QueryCompleted { conn_name, status, outcome, elapsed, .. } => {
                tracing::debug!(
                    conn = %conn_name,
                    %status,
                    ?outcome,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "sql query status"
                );
            }
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<AdapterEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AdapterEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: AdapterEvent) {
        self.events.lock().push(event);
    }
}
