//! Relation (table / view) addressing.

use serde::{Deserialize, Serialize};

/// Identifier quote character for HANA.
pub const QUOTE_CHARACTER: char = '"';

/// Kind of database object a relation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Table,
    View,
    MaterializedView,
    Cte,
    External,
}

impl RelationType {
    /// Relation kinds HANA can `RENAME`.
    pub fn is_renameable(self) -> bool {
        matches!(self, RelationType::Table | RelationType::View)
    }

    /// Relation kinds that can be swapped in place via create-or-replace.
    pub fn is_replaceable(self) -> bool {
        matches!(self, RelationType::Table | RelationType::View)
    }
}

/// A `database.schema.identifier` triple. Any part may be missing while the
/// framework is still resolving it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Relation {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub identifier: Option<String>,
    #[serde(rename = "type")]
    pub relation_type: Option<RelationType>,
}

impl Relation {
    pub fn new(schema: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            database: None,
            schema: Some(schema.into()),
            identifier: Some(identifier.into()),
            relation_type: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_type(mut self, relation_type: RelationType) -> Self {
        self.relation_type = Some(relation_type);
        self
    }

    pub fn is_table(&self) -> bool {
        self.relation_type == Some(RelationType::Table)
    }

    pub fn is_view(&self) -> bool {
        self.relation_type == Some(RelationType::View)
    }

    /// `schema.identifier`, skipping empty parts. HANA has one database per
    /// tenant connection so the database part is never rendered.
    pub fn render(&self) -> String {
        self.parts().collect::<Vec<_>>().join(".")
    }

    /// Same as [`render`](Self::render) with every part quoted.
    pub fn quoted(&self) -> String {
        self.parts()
            .map(quote_identifier)
            .collect::<Vec<_>>()
            .join(".")
    }

    fn parts(&self) -> impl Iterator<Item = &str> {
        [self.schema.as_deref(), self.identifier.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Wrap an identifier in double quotes, doubling embedded quotes.
pub fn quote_identifier(ident: &str) -> String {
    let escaped = ident.replace(QUOTE_CHARACTER, "\"\"");
    format!("{QUOTE_CHARACTER}{escaped}{QUOTE_CHARACTER}")
}
