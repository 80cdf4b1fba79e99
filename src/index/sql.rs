//! DDL text for index changes.

use chrono::{DateTime, Utc};

use super::{ChangeAction, IndexChange, IndexConfig};
use crate::model::relation::quote_identifier;
use crate::model::Relation;
use crate::Result;

pub fn create_index_sql(relation: &Relation, index: &IndexConfig, name: &str) -> String {
    let unique = if index.unique { "unique " } else { "" };
    format!(
        "create {unique}{} index {} on {} ({})",
        index.method.sql_name(),
        quote_identifier(name),
        relation.render(),
        index.columns.join(", "),
    )
}

/// Index names are schema-scoped in HANA, so the drop qualifies with the
/// relation's schema when one is known.
pub fn drop_index_sql(relation: &Relation, name: &str) -> String {
    match relation.schema.as_deref().filter(|s| !s.is_empty()) {
        Some(schema) => format!("drop index {schema}.{}", quote_identifier(name)),
        None => format!("drop index {}", quote_identifier(name)),
    }
}

/// Statement for one reconciliation step. Creates without a name get a
/// fresh one from [`IndexConfig::render_name`]. A change that no longer
/// satisfies its invariants is refused rather than rendered.
pub fn change_sql(relation: &Relation, change: &IndexChange, now: DateTime<Utc>) -> Result<String> {
    change.validate()?;
    let index = &change.context;
    let sql = match change.action {
        ChangeAction::Drop => drop_index_sql(relation, &index.name),
        ChangeAction::Create if index.name.is_empty() => {
            create_index_sql(relation, index, &index.render_name(relation, now))
        }
        ChangeAction::Create => create_index_sql(relation, index, &index.name),
    };
    Ok(sql)
}
