//! Constraint descriptors as the framework declares them in model contracts.

use serde::{Deserialize, Serialize};

/// Closed catalog of constraint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Check,
    NotNull,
    Unique,
    PrimaryKey,
    ForeignKey,
    Custom,
}

/// How the database treats a declared constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSupport {
    Enforced,
    NotEnforced,
    NotSupported,
}

/// A constraint attached to a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConstraint {
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub expression: Option<String>,
    /// Referenced relation for foreign keys.
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub to_columns: Vec<String>,
}

impl ColumnConstraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Self { kind, name: None, expression: None, to: None, to_columns: Vec::new() }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn references(mut self, to: impl Into<String>, to_columns: &[&str]) -> Self {
        self.to = Some(to.into());
        self.to_columns = to_columns.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// A table-level constraint spanning one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConstraint {
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub to_columns: Vec<String>,
}

impl ModelConstraint {
    pub fn new(kind: ConstraintKind, columns: &[&str]) -> Self {
        Self {
            kind,
            name: None,
            expression: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            to: None,
            to_columns: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn references(mut self, to: impl Into<String>, to_columns: &[&str]) -> Self {
        self.to = Some(to.into());
        self.to_columns = to_columns.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// A column entry from a model contract (`columns:` block).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub quote: bool,
    #[serde(default)]
    pub constraints: Vec<ColumnConstraint>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self { name: name.into(), data_type: data_type.into(), quote: false, constraints: Vec::new() }
    }

    pub fn quoted(mut self) -> Self {
        self.quote = true;
        self
    }

    pub fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}
