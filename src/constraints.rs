//! Constraint rendering for `create table` column lists.
//!
//! HANA enforces every constraint kind the framework knows about.

use serde_json::Value as Json;

use crate::model::relation::quote_identifier;
use crate::model::{
    ColumnConstraint, ConstraintKind, ConstraintSupport, ModelConstraint, RawColumn,
};
use crate::{Error, Result};

pub fn constraint_support(_kind: ConstraintKind) -> ConstraintSupport {
    ConstraintSupport::Enforced
}

// ============================================================================
// Parsing
// ============================================================================

pub fn parse_column_constraint(raw: &Json) -> Result<ColumnConstraint> {
    serde_json::from_value(raw.clone())
        .map_err(|e| Error::Configuration(format!("invalid column constraint {raw}: {e}")))
}

pub fn parse_model_constraint(raw: &Json) -> Result<ModelConstraint> {
    serde_json::from_value(raw.clone())
        .map_err(|e| Error::Configuration(format!("invalid model constraint {raw}: {e}")))
}

/// Parse a model contract's `columns` mapping (name → column entry).
pub fn parse_raw_columns(raw: &Json) -> Result<Vec<RawColumn>> {
    let Json::Object(map) = raw else {
        return Err(Error::Configuration(format!("columns must be a mapping, got {raw}")));
    };
    map.values()
        .map(|v| {
            serde_json::from_value(v.clone())
                .map_err(|e| Error::Configuration(format!("invalid column {v}: {e}")))
        })
        .collect()
}

// ============================================================================
// Column level
// ============================================================================

/// DDL fragment for one column constraint, or `None` when the constraint
/// carries nothing to render.
///
/// Check constraints render with a leading comma so they land in the table
/// element list after the column definition.
pub fn render_column_constraint(constraint: &ColumnConstraint) -> Option<String> {
    let expr = constraint.expression.as_deref().unwrap_or("");
    let rendered = match constraint.kind {
        ConstraintKind::Check if !expr.is_empty() => format!(",check ({expr})"),
        ConstraintKind::Check => return None,
        ConstraintKind::NotNull => format!("not null {expr}"),
        ConstraintKind::Unique => format!("unique {expr}"),
        ConstraintKind::PrimaryKey => format!("primary key {expr}"),
        ConstraintKind::ForeignKey => match (&constraint.to, constraint.to_columns.is_empty()) {
            (Some(to), false) => format!("references {to} ({})", constraint.to_columns.join(", ")),
            _ if !expr.is_empty() => format!("references {expr}"),
            _ => return None,
        },
        ConstraintKind::Custom if !expr.is_empty() => expr.to_string(),
        ConstraintKind::Custom => return None,
    };
    Some(rendered.trim().to_string())
}

/// `name type constraint…` for every column, checks last.
pub fn render_raw_columns_constraints(columns: &[RawColumn]) -> Vec<String> {
    columns
        .iter()
        .map(|col| {
            let name = if col.quote { quote_identifier(&col.name) } else { col.name.clone() };
            let mut parts = vec![format!("{name} {}", col.data_type)];

            let (checks, others): (Vec<_>, Vec<_>) = col
                .constraints
                .iter()
                .partition(|c| c.kind == ConstraintKind::Check);
            parts.extend(others.into_iter().chain(checks).filter_map(render_column_constraint));
            parts.join(" ")
        })
        .collect()
}

// ============================================================================
// Model level
// ============================================================================

fn column_list(names: &[String], columns: &[RawColumn]) -> String {
    names
        .iter()
        .map(|n| {
            let quoted = columns.iter().any(|c| &c.name == n && c.quote);
            if quoted { quote_identifier(n) } else { n.clone() }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render_model_constraint(constraint: &ModelConstraint, columns: &[RawColumn]) -> Option<String> {
    let prefix = constraint
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .map(|n| format!("constraint {n} "))
        .unwrap_or_default();
    let expr = constraint.expression.as_deref().filter(|e| !e.is_empty());
    let cols = column_list(&constraint.columns, columns);

    match constraint.kind {
        ConstraintKind::Check => expr.map(|e| format!("{prefix}check ({e})")),
        ConstraintKind::Unique => {
            let e = expr.map(|e| format!(" {e}")).unwrap_or_default();
            Some(format!("{prefix}unique{e} ({cols})"))
        }
        ConstraintKind::PrimaryKey => {
            let e = expr.map(|e| format!(" {e}")).unwrap_or_default();
            Some(format!("{prefix}primary key{e} ({cols})"))
        }
        ConstraintKind::ForeignKey => match (&constraint.to, constraint.to_columns.is_empty()) {
            (Some(to), false) => {
                let to_cols = column_list(&constraint.to_columns, columns);
                Some(format!("{prefix}foreign key ({cols}) references {to} ({to_cols})"))
            }
            _ => expr.map(|e| format!("{prefix}foreign key ({cols}) references {e}")),
        },
        ConstraintKind::Custom => expr.map(|e| format!("{prefix}{e}")),
        // Column-only kind; nothing to say at table level.
        ConstraintKind::NotNull => None,
    }
}

pub fn render_raw_model_constraints(constraints: &[ModelConstraint], columns: &[RawColumn]) -> Vec<String> {
    constraints
        .iter()
        .filter_map(|c| render_model_constraint(c, columns))
        .collect()
}
