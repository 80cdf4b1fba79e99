//! In-memory driver.
//!
//! This is the reference implementation of `Driver`.
//! It never touches a network; statements succeed unless a failure has
//! been scripted, and every network-visible operation is counted.
//!
//! ## Limitations
//!
//! - **No SQL evaluation**: statements are recorded, not run. Row counts
//!   come from `rowcount_for()` rules, defaulting to 0.
//! - **Shared script**: all sessions of one driver (and all its clones)
//!   see the same failure rules, so a test can change behavior mid-session.
//!
//! Use this driver for:
//! - Testing the connection lifecycle and error translation
//! - Dry runs that only need the emitted statement stream

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use super::{
    Canceller, ConnectParams, Driver, DriverError, DriverResult, Session, StatementOutcome,
};
use crate::connection::PROBE_STATEMENT;
use crate::model::Value;

// ============================================================================
// MemoryDriver
// ============================================================================

/// Scriptable in-process driver. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryDriver {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    script: RwLock<Script>,
    executed: Mutex<Vec<String>>,
    stats: Counters,
}

#[derive(Default)]
struct Script {
    connect_failure: Option<DriverError>,
    connect_delay: Option<Duration>,
    probe_failure: Option<DriverError>,
    /// (substring, error) pairs; first match wins.
    statement_failures: Vec<(String, DriverError)>,
    /// (substring, rowcount) pairs; first match wins.
    rowcounts: Vec<(String, i64)>,
    statement_delay: Option<Duration>,
    rollback_failure: Option<DriverError>,
    cancel_failure: Option<DriverError>,
}

#[derive(Default)]
struct Counters {
    connects: AtomicU64,
    statements: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    autocommit_changes: AtomicU64,
    cancels: AtomicU64,
    closes: AtomicU64,
}

/// Snapshot of the operation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStats {
    pub connects: u64,
    pub statements: u64,
    pub commits: u64,
    pub rollbacks: u64,
    pub autocommit_changes: u64,
    pub cancels: u64,
    pub closes: u64,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Scripting
    // ========================================================================

    pub fn fail_connect(&self, err: DriverError) -> &Self {
        self.inner.script.write().connect_failure = Some(err);
        self
    }

    pub fn delay_connect(&self, delay: Duration) -> &Self {
        self.inner.script.write().connect_delay = Some(delay);
        self
    }

    pub fn fail_probe(&self, err: DriverError) -> &Self {
        self.inner.script.write().probe_failure = Some(err);
        self
    }

    pub fn fail_statements_containing(&self, pattern: impl Into<String>, err: DriverError) -> &Self {
        self.inner.script.write().statement_failures.push((pattern.into(), err));
        self
    }

    pub fn rowcount_for(&self, pattern: impl Into<String>, rows: i64) -> &Self {
        self.inner.script.write().rowcounts.push((pattern.into(), rows));
        self
    }

    /// Make every non-probe statement take this long (cancellable).
    pub fn delay_statements(&self, delay: Duration) -> &Self {
        self.inner.script.write().statement_delay = Some(delay);
        self
    }

    pub fn fail_rollback(&self, err: DriverError) -> &Self {
        self.inner.script.write().rollback_failure = Some(err);
        self
    }

    pub fn refuse_cancel(&self, err: DriverError) -> &Self {
        self.inner.script.write().cancel_failure = Some(err);
        self
    }

    /// Drop every scripted failure and delay.
    pub fn heal(&self) -> &Self {
        *self.inner.script.write() = Script::default();
        self
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn stats(&self) -> MemoryStats {
        let c = &self.inner.stats;
        MemoryStats {
            connects: c.connects.load(Ordering::Relaxed),
            statements: c.statements.load(Ordering::Relaxed),
            commits: c.commits.load(Ordering::Relaxed),
            rollbacks: c.rollbacks.load(Ordering::Relaxed),
            autocommit_changes: c.autocommit_changes.load(Ordering::Relaxed),
            cancels: c.cancels.load(Ordering::Relaxed),
            closes: c.closes.load(Ordering::Relaxed),
        }
    }

    /// Every statement text that reached a session, probes included.
    pub fn executed(&self) -> Vec<String> {
        self.inner.executed.lock().clone()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    type Session = MemorySession;

    async fn connect(&self, params: &ConnectParams) -> DriverResult<MemorySession> {
        let (failure, delay) = {
            let script = self.inner.script.read();
            (script.connect_failure.clone(), script.connect_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = failure {
            return Err(err);
        }
        self.inner.stats.connects.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(host = %params.host, port = params.port, "memory session opened");
        Ok(MemorySession {
            inner: self.inner.clone(),
            cancel: Arc::new(MemoryCanceller {
                inner: self.inner.clone(),
                signal: Notify::new(),
            }),
            closed: AtomicBool::new(false),
        })
    }
}

// ============================================================================
// MemorySession
// ============================================================================

pub struct MemorySession {
    inner: Arc<MemoryInner>,
    cancel: Arc<MemoryCanceller>,
    closed: AtomicBool,
}

impl MemorySession {
    fn check_open(&self) -> DriverResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(DriverError::other("session is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn execute(&mut self, sql: &str, _bindings: &[Value]) -> DriverResult<StatementOutcome> {
        self.check_open()?;
        self.inner.stats.statements.fetch_add(1, Ordering::Relaxed);
        self.inner.executed.lock().push(sql.to_string());

        let is_probe = sql == PROBE_STATEMENT;
        let (failure, rowcount, delay) = {
            let script = self.inner.script.read();
            if is_probe {
                (script.probe_failure.clone(), None, None)
            } else {
                let failure = script
                    .statement_failures
                    .iter()
                    .find(|(p, _)| sql.contains(p.as_str()))
                    .map(|(_, e)| e.clone());
                let rowcount = script
                    .rowcounts
                    .iter()
                    .find(|(p, _)| sql.contains(p.as_str()))
                    .map(|(_, n)| *n);
                (failure, rowcount, script.statement_delay)
            }
        };

        if let Some(delay) = delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.signal.notified() => {
                    return Err(DriverError::database(139, "current operation cancelled by request"));
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None if is_probe => Ok(StatementOutcome::rows(1)),
            None => Ok(StatementOutcome { rowcount: Some(rowcount.unwrap_or(0)) }),
        }
    }

    async fn set_autocommit(&mut self, _enabled: bool) -> DriverResult<()> {
        self.check_open()?;
        self.inner.stats.autocommit_changes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn commit(&mut self) -> DriverResult<()> {
        self.check_open()?;
        self.inner.stats.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn rollback(&mut self) -> DriverResult<()> {
        self.check_open()?;
        self.inner.stats.rollbacks.fetch_add(1, Ordering::Relaxed);
        match self.inner.script.read().rollback_failure.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn close(&mut self) -> DriverResult<()> {
        if !self.closed.swap(true, Ordering::Relaxed) {
            self.inner.stats.closes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn canceller(&self) -> Arc<dyn Canceller> {
        self.cancel.clone()
    }
}

// ============================================================================
// MemoryCanceller
// ============================================================================

struct MemoryCanceller {
    inner: Arc<MemoryInner>,
    signal: Notify,
}

impl Canceller for MemoryCanceller {
    fn cancel(&self) -> DriverResult<()> {
        if let Some(err) = self.inner.script.read().cancel_failure.clone() {
            return Err(err);
        }
        self.inner.stats.cancels.fetch_add(1, Ordering::Relaxed);
        // Only wakes a statement that is already waiting; no permit is stored.
        self.signal.notify_waiters();
        Ok(())
    }
}
