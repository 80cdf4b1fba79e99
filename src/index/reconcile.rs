//! Observed → desired index reconciliation.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::{IndexConfig, IndexKey};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Drop,
}

/// One step of an index migration.
///
/// Built only through [`IndexChange::drop`] / [`IndexChange::create`];
/// deserialization is routed through them as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IndexChangeRepr")]
pub struct IndexChange {
    pub action: ChangeAction,
    pub context: IndexConfig,
}

#[derive(Deserialize)]
struct IndexChangeRepr {
    action: ChangeAction,
    context: IndexConfig,
}

impl TryFrom<IndexChangeRepr> for IndexChange {
    type Error = Error;

    fn try_from(repr: IndexChangeRepr) -> Result<Self> {
        IndexChange::new(repr.action, repr.context)
    }
}

impl IndexChange {
    pub fn new(action: ChangeAction, context: IndexConfig) -> Result<Self> {
        match action {
            ChangeAction::Drop => Self::drop(context),
            ChangeAction::Create => Self::create(context),
        }
    }

    /// Decode a serialized change, enforcing the same invariants as the
    /// constructors.
    pub fn from_json(raw: &Json) -> Result<Self> {
        serde_json::from_value(raw.clone())
            .map_err(|e| Error::Configuration(format!("Invalid index change: {e}")))
    }

    /// Re-check the invariants; fields are public and may have been edited
    /// after construction.
    pub fn validate(&self) -> Result<()> {
        Self::new(self.action, self.context.clone()).map(|_| ())
    }

    /// A drop needs the physical name of the index.
    pub fn drop(context: IndexConfig) -> Result<Self> {
        if context.name.is_empty() {
            return Err(Error::Configuration(
                "Invalid operation, attempting to drop an index with no name.".into(),
            ));
        }
        Ok(Self { action: ChangeAction::Drop, context })
    }

    pub fn create(context: IndexConfig) -> Result<Self> {
        if context.columns.is_empty() {
            return Err(Error::Configuration(
                "Invalid operation, attempting to create an index with no columns.".into(),
            ));
        }
        Ok(Self { action: ChangeAction::Create, context })
    }

    /// Index changes never force a rebuild of the relation itself.
    pub fn requires_full_refresh(&self) -> bool {
        false
    }
}

/// Ordered changes that turn `existing` into `desired`.
///
/// Indexes are matched by [`IndexKey`], never by name. Every unmatched
/// existing index is dropped and every unmatched desired index is created;
/// all drops come before all creates so an index redefined on the same
/// columns is removed before its replacement appears. Within each group the
/// input order is preserved, and repeated desired keys are created once.
pub fn reconcile(existing: &[IndexConfig], desired: &[IndexConfig]) -> Result<Vec<IndexChange>> {
    let existing_keys: HashSet<IndexKey> = existing.iter().map(IndexConfig::key).collect();
    let desired_keys: HashSet<IndexKey> = desired.iter().map(IndexConfig::key).collect();

    let mut changes = Vec::new();

    for index in existing {
        if !desired_keys.contains(&index.key()) {
            changes.push(IndexChange::drop(index.clone())?);
        }
    }

    let mut scheduled: HashSet<IndexKey> = HashSet::new();
    for index in desired {
        let key = index.key();
        if !existing_keys.contains(&key) && scheduled.insert(key) {
            changes.push(IndexChange::create(index.clone())?);
        }
    }

    tracing::debug!(
        existing = existing.len(),
        desired = desired.len(),
        changes = changes.len(),
        "reconciled index configuration"
    );
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexMethod;
    use pretty_assertions::assert_eq;

    fn idx(cols: &[&str], unique: bool, method: IndexMethod) -> IndexConfig {
        IndexConfig::new(cols.iter().copied(), unique, method).unwrap()
    }

    #[test]
    fn test_unchanged_yields_nothing() {
        let existing = vec![idx(&["a"], false, IndexMethod::Btree).with_name("idx1")];
        let desired = vec![idx(&["a"], false, IndexMethod::Btree)];
        assert!(reconcile(&existing, &desired).unwrap().is_empty());
    }

    #[test]
    fn test_replacement_drops_then_creates() {
        let existing = vec![idx(&["a"], false, IndexMethod::Btree).with_name("idx1")];
        let desired = vec![idx(&["a"], true, IndexMethod::Btree)];

        let changes = reconcile(&existing, &desired).unwrap();
        assert_eq!(
            changes,
            vec![
                IndexChange { action: ChangeAction::Drop, context: existing[0].clone() },
                IndexChange { action: ChangeAction::Create, context: desired[0].clone() },
            ]
        );
    }

    #[test]
    fn test_drop_without_name_fails_fast() {
        let existing = vec![idx(&["a"], false, IndexMethod::Btree)];
        let err = reconcile(&existing, &[]).unwrap_err();
        assert!(err.to_string().contains("drop an index with no name"));
    }

    #[test]
    fn test_duplicate_desired_created_once() {
        let desired = vec![
            idx(&["x", "y"], true, IndexMethod::InvertedHash),
            idx(&["y", "x"], true, IndexMethod::InvertedHash),
        ];
        let changes = reconcile(&[], &desired).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, ChangeAction::Create);
    }

    #[test]
    fn test_decoded_changes_keep_invariants() {
        let err = IndexChange::from_json(&serde_json::json!({
            "action": "drop",
            "context": {"name": "", "columns": ["a"]}
        }))
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("drop an index with no name"));

        let err = IndexChange::from_json(&serde_json::json!({
            "action": "create",
            "context": {"columns": []}
        }))
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("at least one column"));

        let ok = IndexChange::from_json(&serde_json::json!({
            "action": "drop",
            "context": {"name": "IX1", "columns": ["a"], "unique": true, "method": "CPBTREE"}
        }))
        .unwrap();
        assert_eq!(ok.action, ChangeAction::Drop);
        assert_eq!(ok.context.method, IndexMethod::Cpbtree);
    }

    #[test]
    fn test_create_change_validates_columns() {
        let mut cfg = idx(&["a"], false, IndexMethod::Btree);
        cfg.columns.clear();
        assert!(IndexChange::create(cfg).is_err());
    }
}
