//! Index descriptors and the name-free comparison key.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use smallvec::SmallVec;

use super::IndexMethod;
use crate::model::Relation;
use crate::{Error, Result};

/// Inline capacity for index column lists; composite indexes rarely exceed it.
pub type IndexColumns = SmallVec<[String; 4]>;

/// An observed or desired index.
///
/// `name` is empty when only the desired shape is known. `columns` keeps
/// declaration order for rendering; identity is defined by [`IndexKey`].
///
/// Deserialization goes through [`IndexConfig::new`], so a decoded
/// descriptor always has at least one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IndexConfigRepr")]
pub struct IndexConfig {
    pub name: String,
    pub columns: IndexColumns,
    pub unique: bool,
    pub method: IndexMethod,
}

/// Wire shape of [`IndexConfig`] before validation.
#[derive(Deserialize)]
struct IndexConfigRepr {
    #[serde(default)]
    name: String,
    columns: IndexColumns,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    method: IndexMethod,
}

impl TryFrom<IndexConfigRepr> for IndexConfig {
    type Error = Error;

    fn try_from(repr: IndexConfigRepr) -> Result<Self> {
        Ok(IndexConfig::new(repr.columns, repr.unique, repr.method)?.with_name(repr.name))
    }
}

/// What two indexes must share to be "the same index".
///
/// Columns are an unordered, case-folded set; the name is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexKey {
    pub columns: BTreeSet<String>,
    pub unique: bool,
    pub method: IndexMethod,
}

impl IndexConfig {
    /// Build a descriptor, rejecting an empty column list.
    pub fn new<I, S>(columns: I, unique: bool, method: IndexMethod) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: IndexColumns = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(Error::Configuration(
                "Indexes require at least one column, but none were provided".into(),
            ));
        }
        Ok(Self { name: String::new(), columns, unique, method })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn key(&self) -> IndexKey {
        IndexKey {
            columns: self.columns.iter().map(|c| c.to_lowercase()).collect(),
            unique: self.unique,
            method: self.method,
        }
    }

    /// Parse the raw `indexes:` entry of a model config.
    ///
    /// `null` means "no index" and yields `Ok(None)`. Every rejection names
    /// the offending property so callers can tell the cases apart.
    pub fn parse(raw: &Json) -> Result<Option<Self>> {
        let obj = match raw {
            Json::Null => return Ok(None),
            Json::Object(obj) => obj,
            other => {
                return Err(Error::Configuration(format!(
                    "Invalid index config:\n  Got: {other}\n  Expected a dictionary with at minimum a \"columns\" key"
                )));
            }
        };

        let columns = match obj.get("columns") {
            None => return Err(invalid("'columns' is a required property")),
            Some(Json::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Json::String(s) => Ok(s.clone()),
                    other => Err(invalid(format!("{} is not of type 'string'", repr(other)))),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(invalid(format!("{} is not of type 'array'", repr(other))));
            }
        };

        let unique = match obj.get("unique") {
            None | Some(Json::Null) => false,
            Some(Json::Bool(b)) => *b,
            Some(other) => {
                return Err(invalid(format!("{} is not of type 'boolean'", repr(other))));
            }
        };

        let method = match obj.get("type") {
            None | Some(Json::Null) => IndexMethod::default(),
            Some(Json::String(s)) => s.parse()?,
            Some(other) => {
                return Err(invalid(format!("{} is not of type 'string'", repr(other))));
            }
        };

        Self::new(columns, unique, method).map(Some)
    }

    /// Build a descriptor from one catalog row (`INDEXES` joined with
    /// `INDEX_COLUMNS`), where columns arrive comma-separated.
    pub fn from_observed_row(
        name: &str,
        column_names: &str,
        unique: bool,
        method: &str,
    ) -> Result<Self> {
        let columns = column_names
            .split(',')
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty());
        Ok(Self::new(columns, unique, method.parse()?)?.with_name(name))
    }

    /// Physical name for a new index.
    ///
    /// The timestamp is part of the digest so a rebuilt relation never
    /// collides with the name of the index it replaces.
    pub fn render_name(&self, relation: &Relation, now: DateTime<Utc>) -> String {
        let mut inputs: Vec<String> = self.columns.iter().cloned().collect();
        inputs.push(relation.render());
        inputs.push(self.unique.to_string());
        inputs.push(self.method.sql_name().to_string());
        inputs.push(now.to_rfc3339());
        format!("{:x}", md5::compute(inputs.join("_").as_bytes()))
    }

    /// The dictionary shape accepted by [`parse`](Self::parse).
    pub fn as_node_config(&self) -> Json {
        serde_json::json!({
            "columns": self.columns.iter().collect::<Vec<_>>(),
            "unique": self.unique,
            "type": self.method.sql_name(),
        })
    }
}

fn invalid(detail: impl std::fmt::Display) -> Error {
    Error::Configuration(format!("Invalid index config: {detail}"))
}

/// Quote scalars the way validation messages show them: `'yes'`, `'1'`.
fn repr(v: &Json) -> String {
    match v {
        Json::String(s) => format!("'{s}'"),
        other => format!("'{other}'"),
    }
}
