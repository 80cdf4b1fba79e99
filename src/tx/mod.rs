//! Transaction management.
//!
//! HANA commits every statement on its own unless the session is taken out
//! of auto-commit. The bookkeeping here decides which `begin` / `commit`
//! calls actually reach the database.

use serde::{Deserialize, Serialize};

/// Transaction demarcation mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TxMode {
    /// Every statement commits itself; `begin` and `commit` are no-ops.
    #[default]
    AutoCommit,
    /// Statements accumulate until an explicit commit or rollback.
    Explicit,
}

/// Per-connection transaction state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxState {
    mode: TxMode,
    open: bool,
}

impl TxState {
    pub fn mode(&self) -> TxMode { self.mode }
    pub fn is_open(&self) -> bool { self.open }

    /// Switch modes. Leaving explicit mode discards the open flag; the
    /// caller is responsible for committing first.
    pub fn set_mode(&mut self, mode: TxMode) {
        self.mode = mode;
        if mode == TxMode::AutoCommit {
            self.open = false;
        }
    }

    /// Returns true if a transaction was opened by this call.
    pub fn begin(&mut self) -> bool {
        if self.mode == TxMode::AutoCommit || self.open {
            return false;
        }
        self.open = true;
        true
    }

    /// Whether `commit` must be sent to the database.
    pub fn needs_commit(&self) -> bool {
        self.mode == TxMode::Explicit
    }

    pub fn end(&mut self) {
        self.open = false;
    }
}
