//! Index management.
//!
//! Descriptors for observed and desired indexes, the name-free comparison
//! key, and reconciliation into an ordered list of drop / create changes.

pub mod config;
pub mod reconcile;
pub mod sql;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub use config::{IndexConfig, IndexKey};
pub use reconcile::{reconcile, ChangeAction, IndexChange};

/// Storage / organization strategy of an index.
///
/// Row-store tables take BTREE or CPBTREE; column-store tables take the
/// INVERTED family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum IndexMethod {
    /// B-tree index for equality and range queries.
    #[default]
    #[serde(rename = "BTREE")]
    Btree,
    /// Compressed-prefix B-tree.
    #[serde(rename = "CPBTREE")]
    Cpbtree,
    #[serde(rename = "INVERTED HASH")]
    InvertedHash,
    #[serde(rename = "INVERTED VALUE")]
    InvertedValue,
    #[serde(rename = "INVERTED INDIVIDUAL")]
    InvertedIndividual,
}

impl IndexMethod {
    pub const ALL: [IndexMethod; 5] = [
        IndexMethod::Btree,
        IndexMethod::Cpbtree,
        IndexMethod::InvertedHash,
        IndexMethod::InvertedValue,
        IndexMethod::InvertedIndividual,
    ];

    /// Keyword(s) as they appear in `CREATE ... INDEX`.
    pub fn sql_name(self) -> &'static str {
        match self {
            IndexMethod::Btree => "BTREE",
            IndexMethod::Cpbtree => "CPBTREE",
            IndexMethod::InvertedHash => "INVERTED HASH",
            IndexMethod::InvertedValue => "INVERTED VALUE",
            IndexMethod::InvertedIndividual => "INVERTED INDIVIDUAL",
        }
    }

    pub fn is_row_store(self) -> bool {
        matches!(self, IndexMethod::Btree | IndexMethod::Cpbtree)
    }
}

impl fmt::Display for IndexMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// Case-insensitive; `_` and runs of whitespace both count as one space,
/// so `inverted_hash` and `INVERTED  HASH` parse the same.
impl FromStr for IndexMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s
            .replace('_', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        IndexMethod::ALL
            .into_iter()
            .find(|m| m.sql_name() == normalized)
            .ok_or_else(|| Error::Configuration(format!("unknown index type \"{s}\"")))
    }
}
